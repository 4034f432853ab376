use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use crate::errors::GuardianError;
use crate::models::{AnalysisResult, OverallSeverity};
use super::Notifier;

/// Slack incoming-webhook channel.
pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: &str, timeout: Duration) -> Result<Self, GuardianError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GuardianError::Notification(format!("Failed to build Slack client: {}", e)))?;
        Ok(Self { client, webhook_url: webhook_url.to_string() })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, result: &AnalysisResult) -> Result<(), GuardianError> {
        let resp = self.client
            .post(&self.webhook_url)
            .json(&slack_payload(result))
            .send()
            .await
            .map_err(|e| GuardianError::Network(format!("Slack request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GuardianError::Notification(format!("Slack responded with {}", status)));
        }
        Ok(())
    }

    fn name(&self) -> &str { "slack" }
}

fn severity_color(severity: OverallSeverity) -> &'static str {
    match severity {
        OverallSeverity::Critical => "#FF0000",
        OverallSeverity::High => "#FF8C00",
        OverallSeverity::Medium => "#FFD700",
        OverallSeverity::Low => "#1E90FF",
        OverallSeverity::None => "#808080",
    }
}

/// Attachment-style message with one field per key fact.
pub fn slack_payload(result: &AnalysisResult) -> Value {
    let severity = result.severity.as_str().to_uppercase();
    let anomaly_text = result.anomalies.iter()
        .map(|a| format!("• {}", a.description))
        .collect::<Vec<_>>()
        .join("\n");

    json!({
        "attachments": [{
            "fallback": format!("CI/CD Guardian Alert: {} severity incident", severity),
            "color": severity_color(result.severity),
            "title": "CI/CD Guardian Alert",
            "fields": [
                {"title": "Pipeline ID", "value": result.pipeline_id, "short": true},
                {"title": "Severity", "value": severity, "short": true},
                {"title": "Status", "value": result.status.as_str(), "short": true},
                {"title": "Anomalies Detected", "value": result.anomalies.len().to_string(), "short": true},
            ],
            "text": format!("*Anomalies:*\n{}\n\n*Recommendation:*\n{}", anomaly_text, result.recommendation),
            "footer": "CI/CD Guardian Agent",
            "ts": result.timestamp.timestamp(),
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Anomaly, AnomalyKind, RunStatus};
    use chrono::Utc;

    #[test]
    fn test_payload_fields() {
        let result = AnalysisResult {
            pipeline_id: "build-42".into(),
            status: RunStatus::Failed,
            anomalies: vec![
                Anomaly::new(AnomalyKind::BuildFailure, "Pipeline build failed"),
                Anomaly::new(AnomalyKind::ExcessiveDuration, "Build took too long"),
            ],
            severity: OverallSeverity::High,
            recommendation: "Investigate".into(),
            escalate_to_supervisor: true,
            timestamp: Utc::now(),
        };
        let payload = slack_payload(&result);
        let attachment = &payload["attachments"][0];
        assert_eq!(attachment["color"], "#FF8C00");
        assert_eq!(attachment["fields"][0]["value"], "build-42");
        assert_eq!(attachment["fields"][1]["value"], "HIGH");
        assert_eq!(attachment["fields"][3]["value"], "2");
        let text = attachment["text"].as_str().unwrap();
        assert!(text.contains("• Pipeline build failed\n• Build took too long"));
        assert!(text.ends_with("Investigate"));
    }
}
