//! Pod health classification.
//!
//! The classifier is a pure function from an observed pod snapshot to a
//! verdict with structured reasons. It is total: every phase/container
//! combination yields a verdict, and unrecognized phases fail toward
//! remediation rather than silence.

use k8s_openapi::api::core::v1::Pod;
use serde::Serialize;

use crate::config::SweepConfig;

/// Waiting reasons that always indicate a stuck container.
const CRASH_SIGNATURES: &[&str] = &[
    "CrashLoopBackOff",
    "ImagePullBackOff",
    "ErrImagePull",
    "CreateContainerConfigError",
];

/// Identifies a pod. Used as the worklist key and as the join key between
/// the scan and recovery verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
}

impl std::fmt::Display for PodRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Container state as a tagged union, so the classifier match is exhaustive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    Waiting { reason: String },
    Terminated { exit_code: i32, reason: String },
}

/// Per-container observation, sourced fresh each scan.
#[derive(Debug, Clone)]
pub struct ContainerObservation {
    pub name: String,
    pub state: ContainerState,
    pub restart_count: i32,
}

/// Snapshot of a pod at scan time. Never mutated, only replaced.
#[derive(Debug, Clone)]
pub struct PodObservation {
    pub pod: PodRef,
    pub phase: String,
    pub containers: Vec<ContainerObservation>,
}

/// Health verdict for one pod. Healthy iff `reasons` is empty.
#[derive(Debug, Clone, Serialize)]
pub struct PodVerdict {
    pub pod: PodRef,
    pub phase: String,
    pub reasons: Vec<String>,
}

impl PodVerdict {
    #[must_use]
    pub fn healthy(&self) -> bool {
        self.reasons.is_empty()
    }
}

/// Classify a pod snapshot into a health verdict.
///
/// Rules, first match wins per container; the pod is unhealthy if any
/// container contributes a reason:
///
/// 1. A phase outside the configured healthy set fails the whole pod.
/// 2. A container waiting on a crash signature fails the pod.
/// 3. A container terminated with a non-zero exit code fails the pod.
///
/// A pod with zero containers is healthy when its phase passes.
#[must_use]
pub fn classify(observation: &PodObservation, config: &SweepConfig) -> PodVerdict {
    let mut reasons = Vec::new();

    if config.phase_healthy(&observation.phase) {
        for container in &observation.containers {
            match &container.state {
                ContainerState::Running => {}
                ContainerState::Waiting { reason } => {
                    if is_crash_signature(reason) {
                        reasons.push(format!("container {} waiting: {reason}", container.name));
                    }
                }
                ContainerState::Terminated { exit_code, reason } => {
                    if *exit_code != 0 {
                        reasons.push(format!(
                            "container {} terminated: exit={exit_code} reason={reason}",
                            container.name
                        ));
                    }
                }
            }
        }
    } else {
        reasons.push(format!("unexpected phase: {}", observation.phase));
    }

    PodVerdict {
        pod: observation.pod.clone(),
        phase: observation.phase.clone(),
        reasons,
    }
}

/// Check whether a waiting reason indicates a stuck container.
fn is_crash_signature(reason: &str) -> bool {
    CRASH_SIGNATURES.contains(&reason) || reason.contains("Error") || reason.contains("BackOff")
}

/// Extract a classification snapshot from a raw Kubernetes pod object.
///
/// Returns `None` for pods missing name or namespace metadata, which can
/// only happen for objects the API server has not fully admitted yet.
#[must_use]
pub fn observe(pod: &Pod) -> Option<PodObservation> {
    let name = pod.metadata.name.clone()?;
    let namespace = pod.metadata.namespace.clone()?;

    let status = pod.status.as_ref();
    let phase = status
        .and_then(|s| s.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string());

    let containers = status
        .and_then(|s| s.container_statuses.as_ref())
        .map(|statuses| {
            statuses
                .iter()
                .map(|cs| {
                    let state = cs.state.as_ref().map_or(ContainerState::Running, |state| {
                        if let Some(waiting) = &state.waiting {
                            ContainerState::Waiting {
                                reason: waiting.reason.clone().unwrap_or_default(),
                            }
                        } else if let Some(terminated) = &state.terminated {
                            ContainerState::Terminated {
                                exit_code: terminated.exit_code,
                                reason: terminated.reason.clone().unwrap_or_default(),
                            }
                        } else {
                            ContainerState::Running
                        }
                    });

                    ContainerObservation {
                        name: cs.name.clone(),
                        state,
                        restart_count: cs.restart_count,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    Some(PodObservation {
        pod: PodRef { namespace, name },
        phase,
        containers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod_ref(name: &str) -> PodRef {
        PodRef {
            namespace: "apps".to_string(),
            name: name.to_string(),
        }
    }

    fn running(name: &str) -> ContainerObservation {
        ContainerObservation {
            name: name.to_string(),
            state: ContainerState::Running,
            restart_count: 0,
        }
    }

    fn waiting(name: &str, reason: &str) -> ContainerObservation {
        ContainerObservation {
            name: name.to_string(),
            state: ContainerState::Waiting {
                reason: reason.to_string(),
            },
            restart_count: 3,
        }
    }

    fn terminated(name: &str, exit_code: i32) -> ContainerObservation {
        ContainerObservation {
            name: name.to_string(),
            state: ContainerState::Terminated {
                exit_code,
                reason: "Error".to_string(),
            },
            restart_count: 1,
        }
    }

    fn observation(phase: &str, containers: Vec<ContainerObservation>) -> PodObservation {
        PodObservation {
            pod: pod_ref("web-abc123"),
            phase: phase.to_string(),
            containers,
        }
    }

    #[test]
    fn running_pod_with_running_containers_is_healthy() {
        let config = SweepConfig::default();
        let verdict = classify(
            &observation("Running", vec![running("app"), running("sidecar")]),
            &config,
        );
        assert!(verdict.healthy());
        assert!(verdict.reasons.is_empty());
    }

    #[test]
    fn unexpected_phases_are_unhealthy_regardless_of_containers() {
        let config = SweepConfig::default();
        for phase in ["Pending", "Failed", "Unknown"] {
            let verdict = classify(&observation(phase, vec![running("app")]), &config);
            assert!(!verdict.healthy(), "phase {phase} should be unhealthy");
            assert_eq!(verdict.reasons, vec![format!("unexpected phase: {phase}")]);
        }
    }

    #[test]
    fn succeeded_is_a_healthy_terminal_state() {
        let config = SweepConfig::default();
        let verdict = classify(&observation("Succeeded", vec![]), &config);
        assert!(verdict.healthy());
    }

    #[test]
    fn crash_loop_back_off_names_the_container() {
        let config = SweepConfig::default();
        let verdict = classify(
            &observation("Running", vec![waiting("app", "CrashLoopBackOff")]),
            &config,
        );
        assert!(!verdict.healthy());
        assert_eq!(verdict.reasons.len(), 1);
        assert!(verdict.reasons[0].contains("app"));
        assert!(verdict.reasons[0].contains("CrashLoopBackOff"));
    }

    #[test]
    fn image_pull_failures_are_unhealthy() {
        let config = SweepConfig::default();
        for reason in ["ImagePullBackOff", "ErrImagePull", "CreateContainerConfigError"] {
            let verdict = classify(&observation("Running", vec![waiting("app", reason)]), &config);
            assert!(!verdict.healthy(), "{reason} should be unhealthy");
        }
    }

    #[test]
    fn generic_error_and_back_off_reasons_match_signature() {
        assert!(is_crash_signature("RunContainerError"));
        assert!(is_crash_signature("SomethingBackOff"));
        assert!(!is_crash_signature("ContainerCreating"));
        assert!(!is_crash_signature("PodInitializing"));
    }

    #[test]
    fn benign_waiting_reason_is_healthy() {
        let config = SweepConfig::default();
        let verdict = classify(
            &observation("Running", vec![waiting("app", "ContainerCreating")]),
            &config,
        );
        assert!(verdict.healthy());
    }

    #[test]
    fn zero_exit_never_fails_nonzero_always_does() {
        let config = SweepConfig::default();

        let clean = classify(&observation("Running", vec![terminated("job", 0)]), &config);
        assert!(clean.healthy());

        let crashed = classify(&observation("Running", vec![terminated("job", 7)]), &config);
        assert!(!crashed.healthy());
        assert!(crashed.reasons[0].contains("exit=7"));
    }

    #[test]
    fn mixed_containers_fail_the_whole_pod() {
        let config = SweepConfig::default();
        let verdict = classify(
            &observation(
                "Running",
                vec![running("app"), waiting("sidecar", "CrashLoopBackOff")],
            ),
            &config,
        );
        assert!(!verdict.healthy());
        assert_eq!(verdict.reasons.len(), 1);
        assert!(verdict.reasons[0].contains("sidecar"));
    }

    #[test]
    fn zero_container_pod_passes_on_phase_alone() {
        let config = SweepConfig::default();
        let verdict = classify(&observation("Running", vec![]), &config);
        assert!(verdict.healthy());
    }

    #[test]
    fn observe_extracts_phase_and_container_states() {
        let pod: Pod = serde_json::from_value(serde_json::json!({
            "metadata": { "name": "web-abc", "namespace": "apps" },
            "status": {
                "phase": "Running",
                "containerStatuses": [
                    {
                        "name": "app",
                        "ready": false,
                        "restartCount": 4,
                        "image": "app:1.0",
                        "imageID": "",
                        "state": { "waiting": { "reason": "CrashLoopBackOff" } }
                    }
                ]
            }
        }))
        .unwrap();

        let obs = observe(&pod).unwrap();
        assert_eq!(obs.pod.to_string(), "apps/web-abc");
        assert_eq!(obs.phase, "Running");
        assert_eq!(obs.containers.len(), 1);
        assert_eq!(obs.containers[0].restart_count, 4);
        assert_eq!(
            obs.containers[0].state,
            ContainerState::Waiting {
                reason: "CrashLoopBackOff".to_string()
            }
        );
    }

    #[test]
    fn observe_defaults_missing_status_to_unknown() {
        let pod: Pod = serde_json::from_value(serde_json::json!({
            "metadata": { "name": "orphan", "namespace": "apps" }
        }))
        .unwrap();

        let obs = observe(&pod).unwrap();
        assert_eq!(obs.phase, "Unknown");
        assert!(obs.containers.is_empty());
    }
}
