//! Notification event types emitted by the sweep loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity levels for alerts and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational - normal operations
    Info,
    /// Warning - something needs attention
    Warning,
    /// Critical - immediate action required
    Critical,
}

impl Severity {
    /// Get display name for this severity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        }
    }
}

/// One pod entry inside a report or alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodDetail {
    pub namespace: String,
    pub name: String,
    /// Phase at observation time (`Running`, `Pending`, ...)
    pub phase: String,
    /// Classifier reasons, empty for a successfully deleted pod
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// Events that can trigger notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifyEvent {
    /// A remediation batch finished; summarizes deletions
    CleanupReport {
        deleted: u32,
        failed: u32,
        /// Pods whose deletion failed
        #[serde(default)]
        failures: Vec<PodDetail>,
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },

    /// Pods remained unhealthy after the recovery budget expired
    RecoveryAlert {
        /// Pods still unhealthy, with their classifier reasons
        pods: Vec<PodDetail>,
        elapsed_secs: u64,
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },
}

/// Maximum failed-pod lines included in a cleanup report body.
const REPORT_FAILURE_LIMIT: usize = 10;

/// Maximum length of a single reason line in an alert body.
const REASON_LINE_LIMIT: usize = 100;

impl NotifyEvent {
    /// Get the severity of this event.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::CleanupReport { failed, .. } => {
                if *failed > 0 {
                    Severity::Warning
                } else {
                    Severity::Info
                }
            }
            Self::RecoveryAlert { .. } => Severity::Critical,
        }
    }

    /// Get the timestamp of this event.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::CleanupReport { timestamp, .. } | Self::RecoveryAlert { timestamp, .. } => {
                *timestamp
            }
        }
    }

    /// Get a short title for this event.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::CleanupReport { .. } => "Pod Sweep Report".to_string(),
            Self::RecoveryAlert { pods, .. } => {
                format!("{} pod(s) unhealthy after sweep", pods.len())
            }
        }
    }

    /// Render the event as a plain-text body suitable for any channel.
    #[must_use]
    pub fn body(&self) -> String {
        match self {
            Self::CleanupReport {
                deleted,
                failed,
                failures,
                timestamp,
            } => {
                let mut body = format!(
                    "Time: {}\nDeleted: {deleted}\nFailed: {failed}",
                    timestamp.format("%Y-%m-%d %H:%M:%S UTC")
                );
                if !failures.is_empty() {
                    body.push_str("\n\nFailed deletions:");
                    for pod in failures.iter().take(REPORT_FAILURE_LIMIT) {
                        body.push_str(&format!("\n  - {}/{}", pod.namespace, pod.name));
                    }
                    if failures.len() > REPORT_FAILURE_LIMIT {
                        body.push_str(&format!(
                            "\n  ... and {} more",
                            failures.len() - REPORT_FAILURE_LIMIT
                        ));
                    }
                }
                body
            }
            Self::RecoveryAlert {
                pods, elapsed_secs, ..
            } => {
                let mut body = format!(
                    "{} pod(s) still unhealthy after {elapsed_secs}s of verification:\n",
                    pods.len()
                );
                for pod in pods {
                    body.push_str(&format!(
                        "\nPod: {}/{}\nPhase: {}\n",
                        pod.namespace, pod.name, pod.phase
                    ));
                    for reason in &pod.reasons {
                        body.push_str(&format!("Reason: {}\n", truncate_chars(reason, REASON_LINE_LIMIT)));
                    }
                    body.push_str(&"-".repeat(40));
                    body.push('\n');
                }
                body.push_str("\nManual inspection required");
                body
            }
        }
    }
}

/// Truncate to at most `limit` characters, appending an ellipsis when cut.
/// Reason strings are free text from the cluster and can contain multi-byte
/// characters, so this must never slice mid-codepoint.
fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
