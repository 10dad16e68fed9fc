//! Notification system for pod sweep events.
//!
//! This crate provides a fire-and-forget notification system for pushing
//! sweep reports and recovery alerts to messaging services.
//!
//! # Usage
//!
//! ```no_run
//! use notify::{Notifier, NotifyEvent};
//!
//! // Create notifier from environment variables
//! let notifier = Notifier::from_env();
//!
//! // Send a notification (fire-and-forget)
//! notifier.notify(NotifyEvent::CleanupReport {
//!     deleted: 3,
//!     failed: 0,
//!     failures: vec![],
//!     timestamp: chrono::Utc::now(),
//! });
//! ```
//!
//! # Configuration
//!
//! The notifier is configured via environment variables:
//!
//! - `BARK_BASE_URL`: Bark server URL with device key (enables Bark channel)
//! - `NOTIFY_DISABLED`: Set to "true" to disable all notifications
//!
//! # Architecture
//!
//! The notification system uses a trait-based channel design for extensibility:
//!
//! - [`NotifyChannel`] trait defines the interface for notification channels
//! - [`BarkChannel`] implements Bark webhook push
//! - [`Notifier`] dispatches events to all enabled channels

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod error;
pub mod events;

pub use channels::bark::BarkChannel;
pub use channels::NotifyChannel;
pub use error::ChannelError;
pub use events::{NotifyEvent, PodDetail, Severity};

use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Environment variable to disable all notifications.
const ENV_NOTIFY_DISABLED: &str = "NOTIFY_DISABLED";

/// Central notification dispatcher.
///
/// The `Notifier` manages multiple notification channels and dispatches
/// events to all enabled channels in a fire-and-forget manner.
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
    disabled: bool,
}

impl Notifier {
    /// Create a new notifier from environment variables.
    ///
    /// This will auto-detect which channels are configured based on
    /// environment variables and enable them accordingly.
    #[must_use]
    pub fn from_env() -> Self {
        let disabled = std::env::var(ENV_NOTIFY_DISABLED)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        if disabled {
            info!("Notifications disabled via NOTIFY_DISABLED");
            return Self {
                channels: vec![],
                disabled: true,
            };
        }

        let mut channels: Vec<Arc<dyn NotifyChannel>> = vec![];

        let bark = BarkChannel::from_env();
        if bark.enabled() {
            info!("Bark notifications enabled");
            channels.push(Arc::new(bark));
        }

        if channels.is_empty() {
            warn!("No notification channels configured");
        } else {
            info!(
                channel_count = channels.len(),
                "Notification system initialized"
            );
        }

        Self {
            channels,
            disabled: false,
        }
    }

    /// Create a notifier with specific channels.
    #[must_use]
    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        Self {
            channels,
            disabled: false,
        }
    }

    /// Create a disabled notifier (for testing or when notifications are off).
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            channels: vec![],
            disabled: true,
        }
    }

    /// Check if any notification channels are enabled.
    #[must_use]
    pub fn has_channels(&self) -> bool {
        !self.disabled && !self.channels.is_empty()
    }

    /// Send a notification to all enabled channels (fire-and-forget).
    ///
    /// This method spawns async tasks for each channel and returns immediately.
    /// Errors are logged but not propagated to the caller.
    pub fn notify(&self, event: NotifyEvent) {
        if self.disabled {
            debug!("Notifications disabled, skipping event");
            return;
        }

        if self.channels.is_empty() {
            debug!("No channels configured, skipping event");
            return;
        }

        let event = Arc::new(event);

        for channel in &self.channels {
            let channel = Arc::clone(channel);
            let event = Arc::clone(&event);

            tokio::spawn(async move {
                let channel_name = channel.name();

                if !channel.enabled() {
                    debug!(channel = channel_name, "Channel disabled, skipping");
                    return;
                }

                match channel.send(&event).await {
                    Ok(()) => {
                        debug!(channel = channel_name, "Notification sent");
                    }
                    Err(e) => {
                        error!(
                            channel = channel_name,
                            error = %e,
                            "Failed to send notification"
                        );
                    }
                }
            });
        }
    }

    /// Send a notification and wait for all channels to complete.
    ///
    /// Unlike `notify()`, this method waits for each channel to finish and
    /// collects the per-channel outcome. Used by the sweep loop so a report
    /// is delivered before the cycle moves on to verification.
    pub async fn notify_and_wait(
        &self,
        event: NotifyEvent,
    ) -> Vec<(String, Result<(), ChannelError>)> {
        if self.disabled || self.channels.is_empty() {
            return vec![];
        }

        let mut results = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let channel_name = channel.name().to_string();

            if !channel.enabled() {
                continue;
            }

            let result = channel.send(&event).await;
            if let Err(e) = &result {
                error!(channel = %channel_name, error = %e, "Failed to send notification");
            }
            results.push((channel_name, result));
        }

        results
    }
}
