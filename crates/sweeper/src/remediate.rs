//! Batch remediation: delete unhealthy pods so their controllers recreate
//! them.

use serde::Serialize;
use tracing::{info, warn};

use crate::cluster::ClusterGateway;
use crate::health::PodRef;

/// Outcome of one pod deletion attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RemediationResult {
    pub pod: PodRef,
    pub deleted: bool,
    pub error: Option<String>,
}

/// Delete the targeted pods one at a time.
///
/// Deletions are deliberately sequential to keep load on the API server
/// low and steady. Each uses a zero-second grace period: a stuck pod gains
/// nothing from a drain window and rapid recreation is the goal. A failed
/// deletion is recorded and the batch continues; the pod may already be
/// gone by the time we get to it.
pub async fn remediate(gateway: &dyn ClusterGateway, targets: &[PodRef]) -> Vec<RemediationResult> {
    let mut results = Vec::with_capacity(targets.len());

    for pod in targets {
        match gateway.delete_pod(&pod.namespace, &pod.name, 0).await {
            Ok(()) => {
                info!(pod = %pod, "Deleted pod");
                results.push(RemediationResult {
                    pod: pod.clone(),
                    deleted: true,
                    error: None,
                });
            }
            Err(e) => {
                warn!(pod = %pod, error = %e, "Failed to delete pod");
                results.push(RemediationResult {
                    pod: pod.clone(),
                    deleted: false,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    results
}
