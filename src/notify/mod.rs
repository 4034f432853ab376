//! Outbound alert delivery for escalated analyses.

pub mod slack;
pub mod webhook;

use std::sync::Arc;
use async_trait::async_trait;
use crate::config::NotificationConfig;
use crate::errors::GuardianError;
use crate::models::{AnalysisResult, OverallSeverity};
use tracing::{info, warn};

pub use slack::SlackNotifier;
pub use webhook::WebhookNotifier;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one alert. Called at most once per result.
    async fn notify(&self, result: &AnalysisResult) -> Result<(), GuardianError>;

    /// Channel name for logging
    fn name(&self) -> &str;
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub channel: String,
    pub delivered: bool,
}

/// Fans an escalated result out to every configured channel.
#[derive(Clone)]
pub struct NotificationDispatcher {
    channels: Vec<Arc<dyn Notifier>>,
    alert_on: Vec<OverallSeverity>,
}

impl NotificationDispatcher {
    pub fn new(channels: Vec<Arc<dyn Notifier>>, alert_on: Vec<OverallSeverity>) -> Self {
        Self { channels, alert_on }
    }

    pub fn from_config(config: &NotificationConfig) -> Result<Self, GuardianError> {
        let mut channels: Vec<Arc<dyn Notifier>> = Vec::new();

        if let Some(url) = configured_url(config.slack_webhook.as_deref()) {
            channels.push(Arc::new(SlackNotifier::new(url, config.timeout())?));
        } else if config.slack_webhook.is_some() {
            info!("Slack webhook is not an http(s) URL, skipping channel");
        }
        if let Some(url) = configured_url(config.webhook_url.as_deref()) {
            channels.push(Arc::new(WebhookNotifier::new(url, config.timeout())?));
        }

        let dispatcher = Self::new(channels, config.alert_on.clone());
        if dispatcher.is_empty() {
            info!("No notification channels configured, escalations are only logged");
        } else {
            info!(
                channels = ?dispatcher.channel_names(),
                alert_on = ?config.alert_on,
                "Notification dispatcher ready"
            );
        }
        Ok(dispatcher)
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn should_notify(&self, result: &AnalysisResult) -> bool {
        result.escalate_to_supervisor && self.alert_on.contains(&result.severity)
    }

    /// Attempt delivery once per channel. Failures are logged, never returned.
    pub async fn dispatch(&self, result: &AnalysisResult) -> Vec<Delivery> {
        if !self.should_notify(result) {
            return Vec::new();
        }

        let mut deliveries = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let delivered = match channel.notify(result).await {
                Ok(()) => {
                    info!(channel = channel.name(), pipeline_id = %result.pipeline_id, "Alert delivered");
                    true
                }
                Err(e) => {
                    warn!(channel = channel.name(), pipeline_id = %result.pipeline_id, error = %e, "Alert delivery failed");
                    false
                }
            };
            deliveries.push(Delivery { channel: channel.name().to_string(), delivered });
        }
        deliveries
    }
}

fn configured_url(url: Option<&str>) -> Option<&str> {
    url.map(str::trim)
        .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
}
