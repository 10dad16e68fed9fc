//! Bounded recovery verification.
//!
//! After remediation the controller-recreated replacement pods need a
//! moment to schedule and start. The verifier polls the affected
//! namespaces until they come back clean or a cluster-size-derived budget
//! runs out. Replacement pods carry fresh names, so matching is scoped by
//! namespace rather than by the deleted pod's name.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cluster::ClusterGateway;
use crate::config::SweepConfig;
use crate::health::{self, PodRef, PodVerdict};

/// Cluster size class, derived from namespace count at verification time.
///
/// Larger clusters get a tighter budget with a longer poll interval: more
/// namespaces per poll means each poll is more expensive, and the cycle
/// cadence still has to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClusterSizeClass {
    Small,
    Medium,
    Large,
}

impl ClusterSizeClass {
    /// Classify a cluster by namespace count. A step function, not
    /// interpolated.
    #[must_use]
    pub const fn from_namespace_count(count: usize) -> Self {
        if count <= 50 {
            Self::Small
        } else if count <= 200 {
            Self::Medium
        } else {
            Self::Large
        }
    }

    /// Total wall-clock budget for verification polling.
    #[must_use]
    pub const fn budget(self) -> Duration {
        match self {
            Self::Small => Duration::from_secs(180),
            Self::Medium => Duration::from_secs(150),
            Self::Large => Duration::from_secs(120),
        }
    }

    /// Sleep between polls.
    #[must_use]
    pub const fn interval(self) -> Duration {
        match self {
            Self::Small | Self::Medium => Duration::from_secs(30),
            Self::Large => Duration::from_secs(60),
        }
    }
}

/// Result of one verification pass.
#[derive(Debug, Serialize)]
pub struct VerificationOutcome {
    /// Pods still unhealthy at the last poll
    pub still_unhealthy: Vec<PodVerdict>,
    /// Wall-clock time spent verifying
    pub elapsed: Duration,
    /// True when the poll budget expired before recovery
    pub exhausted_budget: bool,
}

impl VerificationOutcome {
    #[must_use]
    pub fn all_recovered(&self) -> bool {
        self.still_unhealthy.is_empty()
    }
}

/// Poll the namespaces of the targeted pods until all pods there are
/// healthy or the size-class budget expires.
///
/// Early exit on a clean poll is the common path. The final poll is
/// skipped when it would start at or past the deadline; instead the
/// remaining budget is slept out so slow pods get the full window counted
/// against them before the residual set is reported. All sleeps race the
/// cancellation token so shutdown is responsive mid-verification.
pub async fn verify(
    gateway: &dyn ClusterGateway,
    targets: &[PodRef],
    namespace_count: usize,
    config: &SweepConfig,
    cancel: &CancellationToken,
) -> VerificationOutcome {
    let class = ClusterSizeClass::from_namespace_count(namespace_count);
    let budget = class.budget();
    let interval = class.interval();
    let start = Instant::now();

    let namespaces = distinct_namespaces(targets);
    info!(
        class = ?class,
        budget_secs = budget.as_secs(),
        interval_secs = interval.as_secs(),
        namespaces = namespaces.len(),
        "Verifying pod recovery"
    );

    loop {
        let still_unhealthy = check_namespaces(gateway, &namespaces, config).await;

        if still_unhealthy.is_empty() {
            let elapsed = start.elapsed();
            info!(elapsed_secs = elapsed.as_secs(), "All pods recovered");
            return VerificationOutcome {
                still_unhealthy,
                elapsed,
                exhausted_budget: false,
            };
        }

        let elapsed = start.elapsed();
        debug!(
            unhealthy = still_unhealthy.len(),
            elapsed_secs = elapsed.as_secs(),
            "Pods still unhealthy"
        );

        if elapsed + interval >= budget {
            // Another poll would start at or past the deadline. Run the
            // remaining budget out, then report the residual set.
            let remaining = budget.saturating_sub(elapsed);
            if !sleep_or_cancel(remaining, cancel).await {
                return VerificationOutcome {
                    still_unhealthy,
                    elapsed: start.elapsed(),
                    exhausted_budget: false,
                };
            }
            warn!(
                unhealthy = still_unhealthy.len(),
                elapsed_secs = start.elapsed().as_secs(),
                "Verification budget exhausted"
            );
            return VerificationOutcome {
                still_unhealthy,
                elapsed: start.elapsed(),
                exhausted_budget: true,
            };
        }

        if !sleep_or_cancel(interval, cancel).await {
            return VerificationOutcome {
                still_unhealthy,
                elapsed: start.elapsed(),
                exhausted_budget: false,
            };
        }
    }
}

/// Re-scan the given namespaces and return all unhealthy verdicts.
/// Listing failures are skipped, same as the scanner: the next full scan
/// will catch anything missed here.
async fn check_namespaces(
    gateway: &dyn ClusterGateway,
    namespaces: &[String],
    config: &SweepConfig,
) -> Vec<PodVerdict> {
    let mut unhealthy = Vec::new();

    for namespace in namespaces {
        match gateway.list_pods(namespace).await {
            Ok(observations) => {
                for observation in &observations {
                    let verdict = health::classify(observation, config);
                    if !verdict.healthy() {
                        unhealthy.push(verdict);
                    }
                }
            }
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "Failed to re-check namespace");
            }
        }
    }

    unhealthy
}

/// Distinct namespaces of the targets, in first-seen order.
fn distinct_namespaces(targets: &[PodRef]) -> Vec<String> {
    let mut namespaces: Vec<String> = Vec::new();
    for target in targets {
        if !namespaces.contains(&target.namespace) {
            namespaces.push(target.namespace.clone());
        }
    }
    namespaces
}

/// Sleep for the given duration, returning false if cancelled first.
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}
