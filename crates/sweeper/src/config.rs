//! Sweep configuration.
//!
//! A `SweepConfig` is built once at startup from CLI flags and environment
//! variables, then passed by reference into every component. Nothing in the
//! classification or verification path reads ambient state.

use std::collections::HashSet;
use std::time::Duration;

/// Default interval between sweep cycles.
pub const DEFAULT_RUN_INTERVAL_SECS: u64 = 600;

/// Default page size for pod listing.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Namespaces that are never swept unless explicitly overridden.
pub const DEFAULT_EXCLUDED_NAMESPACES: &[&str] = &["kube-system"];

/// Pod phases that do not by themselves mark a pod unhealthy.
///
/// `Init` covers pods still running init containers; `Succeeded` is a
/// healthy terminal state for run-to-completion workloads.
pub const HEALTHY_POD_PHASES: &[&str] = &["Running", "Init", "Succeeded"];

/// Immutable configuration for the sweep loop.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Namespaces excluded from scanning, remediation and verification
    pub excluded_namespaces: HashSet<String>,
    /// Phases that pass the phase check in the health classifier
    pub healthy_phases: Vec<String>,
    /// Wall-clock cadence between cycle starts
    pub run_interval: Duration,
    /// Page size for paginated pod listing
    pub page_size: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            excluded_namespaces: DEFAULT_EXCLUDED_NAMESPACES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            healthy_phases: HEALTHY_POD_PHASES.iter().map(|s| (*s).to_string()).collect(),
            run_interval: Duration::from_secs(DEFAULT_RUN_INTERVAL_SECS),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SweepConfig {
    /// Check whether a namespace is excluded from sweeping.
    #[must_use]
    pub fn is_excluded(&self, namespace: &str) -> bool {
        self.excluded_namespaces.contains(namespace)
    }

    /// Check whether a pod phase counts as healthy on its own.
    #[must_use]
    pub fn phase_healthy(&self, phase: &str) -> bool {
        self.healthy_phases.iter().any(|p| p == phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_exclude_kube_system() {
        let config = SweepConfig::default();
        assert!(config.is_excluded("kube-system"));
        assert!(!config.is_excluded("default"));
    }

    #[test]
    fn default_phases_are_running_init_succeeded() {
        let config = SweepConfig::default();
        assert!(config.phase_healthy("Running"));
        assert!(config.phase_healthy("Init"));
        assert!(config.phase_healthy("Succeeded"));
        assert!(!config.phase_healthy("Pending"));
        assert!(!config.phase_healthy("Failed"));
        assert!(!config.phase_healthy("Unknown"));
    }

    #[test]
    fn default_cadence_is_ten_minutes() {
        let config = SweepConfig::default();
        assert_eq!(config.run_interval, Duration::from_secs(600));
        assert_eq!(config.page_size, 500);
    }
}
