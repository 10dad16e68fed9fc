//! The sweep cycle orchestrator.
//!
//! Sequences scan → remediate → report → verify → alert → sleep, forever.
//! Cycles hold a constant wall-clock cadence: the sleep at the end is the
//! configured interval minus however long the cycle's work took. A cycle
//! that blows past the interval is followed immediately by the next one;
//! missed cycles are never queued.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use notify::Notifier;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cluster::ClusterGateway;
use crate::config::SweepConfig;
use crate::health::PodRef;
use crate::{remediate, report, scanner, verify};

/// Summary of one completed sweep cycle.
#[derive(Debug, Serialize)]
pub struct CycleSummary {
    pub run: u64,
    pub namespaces: usize,
    pub unhealthy: usize,
    pub deleted: usize,
    pub delete_failed: usize,
    pub recovered: bool,
    pub duration_secs: u64,
}

/// Owns the sweep loop and its collaborators.
pub struct Orchestrator {
    gateway: Arc<dyn ClusterGateway>,
    notifier: Notifier,
    config: SweepConfig,
    cancel: CancellationToken,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn ClusterGateway>,
        notifier: Notifier,
        config: SweepConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            notifier,
            config,
            cancel,
        }
    }

    /// Run sweep cycles until cancelled.
    ///
    /// A failing cycle is logged and counted; the loop always continues to
    /// the next cycle. Only startup (before this is called) may abort the
    /// process.
    pub async fn run(&self) {
        let mut run_count: u64 = 0;

        loop {
            if self.cancel.is_cancelled() {
                info!("Shutdown requested, stopping sweep loop");
                return;
            }

            run_count += 1;
            let start = Instant::now();
            info!(run = run_count, "Starting sweep cycle");

            match self.run_cycle(run_count).await {
                Ok(summary) => {
                    info!(
                        run = summary.run,
                        namespaces = summary.namespaces,
                        unhealthy = summary.unhealthy,
                        deleted = summary.deleted,
                        delete_failed = summary.delete_failed,
                        recovered = summary.recovered,
                        duration_secs = summary.duration_secs,
                        "Sweep cycle complete"
                    );
                }
                Err(e) => {
                    error!(run = run_count, error = %e, "Sweep cycle failed");
                }
            }

            let sleep_for = cadence_sleep(self.config.run_interval, start.elapsed());
            info!(
                sleep_secs = sleep_for.as_secs(),
                "Sleeping until next cycle"
            );

            tokio::select! {
                () = self.cancel.cancelled() => {
                    info!("Shutdown requested during sleep, stopping sweep loop");
                    return;
                }
                () = tokio::time::sleep(sleep_for) => {}
            }
        }
    }

    /// Run exactly one sweep cycle.
    pub async fn run_cycle(&self, run: u64) -> Result<CycleSummary> {
        let start = Instant::now();

        // Scan. A namespace listing failure here is fatal to the cycle:
        // without the namespace set there is nothing to sweep.
        let namespaces = self.gateway.list_namespaces().await?;
        let worklist = scanner::scan(self.gateway.as_ref(), &namespaces, &self.config).await;

        if worklist.is_empty() {
            info!(run, "No unhealthy pods found");
            return Ok(CycleSummary {
                run,
                namespaces: namespaces.len(),
                unhealthy: 0,
                deleted: 0,
                delete_failed: 0,
                recovered: true,
                duration_secs: start.elapsed().as_secs(),
            });
        }

        // Remediate.
        let targets: Vec<PodRef> = worklist.iter().map(|v| v.pod.clone()).collect();
        let results = remediate::remediate(self.gateway.as_ref(), &targets).await;
        let deleted = results.iter().filter(|r| r.deleted).count();
        let delete_failed = results.len() - deleted;

        // Report. Delivery failures are logged inside the notifier and
        // never affect the cycle.
        self.notifier
            .notify_and_wait(report::cleanup_report(&results))
            .await;

        // Verify recovery in the affected namespaces.
        let outcome = verify::verify(
            self.gateway.as_ref(),
            &targets,
            namespaces.len(),
            &self.config,
            &self.cancel,
        )
        .await;

        // Alert on residual failures. Fire-and-forget: the alert is
        // best-effort and must not hold up the cadence sleep.
        if !outcome.all_recovered() {
            self.notifier.notify(report::recovery_alert(&outcome));
        }

        Ok(CycleSummary {
            run,
            namespaces: namespaces.len(),
            unhealthy: worklist.len(),
            deleted,
            delete_failed,
            recovered: outcome.all_recovered(),
            duration_secs: start.elapsed().as_secs(),
        })
    }
}

/// Sleep needed to hold the cycle cadence. Never negative: a cycle that
/// overran its interval is followed immediately by the next one.
#[must_use]
pub fn cadence_sleep(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{GatewayError, MockClusterGateway};
    use crate::health::{ContainerObservation, ContainerState, PodObservation};
    use mockall::predicate::eq;

    fn crash_looping_pod(namespace: &str, name: &str) -> PodObservation {
        PodObservation {
            pod: PodRef {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            phase: "Running".to_string(),
            containers: vec![ContainerObservation {
                name: "app".to_string(),
                state: ContainerState::Waiting {
                    reason: "CrashLoopBackOff".to_string(),
                },
                restart_count: 5,
            }],
        }
    }

    fn healthy_pod(namespace: &str, name: &str) -> PodObservation {
        PodObservation {
            pod: PodRef {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            phase: "Running".to_string(),
            containers: vec![ContainerObservation {
                name: "app".to_string(),
                state: ContainerState::Running,
                restart_count: 0,
            }],
        }
    }

    fn api_error() -> GatewayError {
        GatewayError::Kube(kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: "connection refused".to_string(),
            reason: "ServiceUnavailable".to_string(),
            code: 503,
        }))
    }

    #[test]
    fn cadence_sleep_is_never_negative() {
        assert_eq!(
            cadence_sleep(Duration::from_secs(600), Duration::from_secs(650)),
            Duration::ZERO
        );
        assert_eq!(
            cadence_sleep(Duration::from_secs(600), Duration::from_secs(45)),
            Duration::from_secs(555)
        );
        assert_eq!(
            cadence_sleep(Duration::from_secs(600), Duration::from_secs(600)),
            Duration::ZERO
        );
    }

    fn orchestrator(gateway: MockClusterGateway) -> Orchestrator {
        Orchestrator::new(
            Arc::new(gateway),
            Notifier::disabled(),
            SweepConfig::default(),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn quiet_cluster_produces_an_empty_cycle() {
        let mut gateway = MockClusterGateway::new();
        gateway
            .expect_list_namespaces()
            .returning(|| Ok(vec!["apps".to_string()]));
        gateway
            .expect_list_pods()
            .with(eq("apps"))
            .times(1)
            .returning(|_| Ok(vec![healthy_pod("apps", "web-1")]));

        let summary = orchestrator(gateway).run_cycle(1).await.unwrap();
        assert_eq!(summary.unhealthy, 0);
        assert_eq!(summary.deleted, 0);
        assert!(summary.recovered);
    }

    #[tokio::test(start_paused = true)]
    async fn full_cycle_deletes_and_verifies() {
        let mut gateway = MockClusterGateway::new();
        gateway
            .expect_list_namespaces()
            .returning(|| Ok(vec!["ns-a".to_string(), "ns-b".to_string(), "kube-system".to_string()]));

        // Scan pass: ns-b has the crash-looper. Verification pass re-lists
        // only ns-b and sees the healthy replacement.
        let mut ns_b_calls = 0;
        gateway
            .expect_list_pods()
            .with(eq("ns-a"))
            .times(1)
            .returning(|_| Ok(vec![healthy_pod("ns-a", "api-1")]));
        gateway
            .expect_list_pods()
            .with(eq("ns-b"))
            .returning(move |_| {
                ns_b_calls += 1;
                if ns_b_calls == 1 {
                    Ok(vec![crash_looping_pod("ns-b", "worker-1")])
                } else {
                    Ok(vec![healthy_pod("ns-b", "worker-2")])
                }
            });
        gateway
            .expect_delete_pod()
            .with(eq("ns-b"), eq("worker-1"), eq(0))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let summary = orchestrator(gateway).run_cycle(1).await.unwrap();
        assert_eq!(summary.unhealthy, 1);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.delete_failed, 0);
        assert!(summary.recovered);
    }

    #[tokio::test]
    async fn namespace_list_failure_fails_the_cycle_not_the_process() {
        let mut gateway = MockClusterGateway::new();
        gateway
            .expect_list_namespaces()
            .returning(|| Err(api_error()));

        let result = orchestrator(gateway).run_cycle(1).await;
        assert!(result.is_err());
    }
}
