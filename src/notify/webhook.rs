use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use crate::errors::GuardianError;
use crate::models::AnalysisResult;
use super::Notifier;

/// Posts the full analysis result as JSON to an arbitrary endpoint.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, GuardianError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GuardianError::Notification(format!("Failed to build webhook client: {}", e)))?;
        Ok(Self { client, url: url.to_string() })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, result: &AnalysisResult) -> Result<(), GuardianError> {
        let body = json!({
            "event": "pipeline.escalation",
            "source": "cicd-guardian",
            "result": result,
        });

        let resp = self.client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GuardianError::Network(format!("Webhook request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GuardianError::Notification(format!("Webhook responded with {}", status)));
        }
        Ok(())
    }

    fn name(&self) -> &str { "webhook" }
}
