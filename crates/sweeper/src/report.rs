//! Builds notification events from cycle results.

use chrono::Utc;
use notify::{NotifyEvent, PodDetail};

use crate::remediate::RemediationResult;
use crate::verify::VerificationOutcome;

/// Build the post-remediation cleanup report.
#[must_use]
pub fn cleanup_report(results: &[RemediationResult]) -> NotifyEvent {
    let deleted = results.iter().filter(|r| r.deleted).count() as u32;
    let failed = results.iter().filter(|r| !r.deleted).count() as u32;

    let failures = results
        .iter()
        .filter(|r| !r.deleted)
        .map(|r| PodDetail {
            namespace: r.pod.namespace.clone(),
            name: r.pod.name.clone(),
            phase: String::new(),
            reasons: r.error.iter().cloned().collect(),
        })
        .collect();

    NotifyEvent::CleanupReport {
        deleted,
        failed,
        failures,
        timestamp: Utc::now(),
    }
}

/// Build the residual-failure alert from a verification outcome.
///
/// One aggregated notification covers every still-unhealthy pod; per-pod
/// pushes would flood the channel on a bad cycle.
#[must_use]
pub fn recovery_alert(outcome: &VerificationOutcome) -> NotifyEvent {
    let pods = outcome
        .still_unhealthy
        .iter()
        .map(|verdict| PodDetail {
            namespace: verdict.pod.namespace.clone(),
            name: verdict.pod.name.clone(),
            phase: verdict.phase.clone(),
            reasons: verdict.reasons.clone(),
        })
        .collect();

    NotifyEvent::RecoveryAlert {
        pods,
        elapsed_secs: outcome.elapsed.as_secs(),
        timestamp: Utc::now(),
    }
}
