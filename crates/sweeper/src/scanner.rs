//! Cluster-wide scan for unhealthy pods.

use tracing::{debug, info, warn};

use crate::cluster::ClusterGateway;
use crate::config::SweepConfig;
use crate::health::{self, PodVerdict};

/// Scan the given namespaces and return the unhealthy verdicts.
///
/// Excluded namespaces are never visited. A namespace whose pod listing
/// fails is logged and skipped for this cycle; one broken namespace must
/// not block remediation elsewhere.
pub async fn scan(
    gateway: &dyn ClusterGateway,
    namespaces: &[String],
    config: &SweepConfig,
) -> Vec<PodVerdict> {
    let mut unhealthy = Vec::new();

    for namespace in namespaces {
        if config.is_excluded(namespace) {
            debug!(namespace = %namespace, "Namespace excluded, skipping");
            continue;
        }

        let observations = match gateway.list_pods(namespace).await {
            Ok(observations) => observations,
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "Failed to list pods, skipping namespace");
                continue;
            }
        };

        for observation in &observations {
            let verdict = health::classify(observation, config);
            if !verdict.healthy() {
                info!(
                    pod = %verdict.pod,
                    phase = %verdict.phase,
                    reasons = ?verdict.reasons,
                    "Found unhealthy pod"
                );
                unhealthy.push(verdict);
            }
        }
    }

    unhealthy
}
