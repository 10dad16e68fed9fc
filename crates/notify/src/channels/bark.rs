//! Bark webhook notification channel.
//!
//! Bark is a self-hostable iOS push service with a single-endpoint HTTP API:
//! `POST <base-url>/push` with a JSON body of `{title, body, level, ...}`.
//! The base URL embeds the device key, so it is treated as a secret and only
//! ever read from the environment.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::error::ChannelError;
use crate::events::{NotifyEvent, Severity};
use crate::NotifyChannel;

/// Environment variable for the Bark server base URL (including device key).
const ENV_BARK_BASE_URL: &str = "BARK_BASE_URL";

/// Request timeout for push delivery.
const PUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default notification icon.
const DEFAULT_ICON: &str = "https://cdn-icons-png.flaticon.com/512/2907/2907253.png";

/// Icon used for critical alerts.
const ALERT_ICON: &str = "https://cdn-icons-png.flaticon.com/512/564/564619.png";

/// Bark webhook notification channel.
pub struct BarkChannel {
    base_url: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct BarkPayload {
    title: String,
    body: String,
    icon: String,
    level: String,
    /// Keep the push in the device history
    isarchive: u8,
}

impl BarkChannel {
    /// Create a new Bark channel from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = std::env::var(ENV_BARK_BASE_URL).ok();

        if base_url.is_some() {
            debug!("Bark notifications enabled");
        } else {
            debug!("Bark notifications disabled (BARK_BASE_URL not set)");
        }

        Self::build(base_url)
    }

    /// Create a Bark channel with a specific base URL.
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self::build(Some(base_url))
    }

    fn build(base_url: Option<String>) -> Self {
        Self {
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
            client: reqwest::Client::builder()
                .timeout(PUSH_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Map event severity to a Bark push level.
    fn level_for(severity: Severity) -> &'static str {
        match severity {
            Severity::Info => "passive",
            Severity::Warning => "active",
            Severity::Critical => "timeSensitive",
        }
    }

    fn format_payload(event: &NotifyEvent) -> BarkPayload {
        let icon = match event.severity() {
            Severity::Critical => ALERT_ICON,
            _ => DEFAULT_ICON,
        };

        BarkPayload {
            title: event.title(),
            body: event.body(),
            icon: icon.to_string(),
            level: Self::level_for(event.severity()).to_string(),
            isarchive: 1,
        }
    }
}

#[async_trait]
impl NotifyChannel for BarkChannel {
    fn name(&self) -> &'static str {
        "bark"
    }

    fn enabled(&self) -> bool {
        self.base_url.is_some()
    }

    async fn send(&self, event: &NotifyEvent) -> Result<(), ChannelError> {
        let base_url = self
            .base_url
            .as_ref()
            .ok_or_else(|| ChannelError::NotConfigured("BARK_BASE_URL not set".to_string()))?;

        let payload = Self::format_payload(event);
        let response = self
            .client
            .post(format!("{base_url}/push"))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ChannelError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        debug!(title = %payload.title, "Bark push delivered");
        Ok(())
    }
}
