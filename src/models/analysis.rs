use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use super::anomaly::{Anomaly, Severity};
use super::report::RunStatus;

/// Aggregated verdict for a whole report. `None` means no anomaly was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallSeverity {
    Critical,
    High,
    Medium,
    Low,
    None,
}

impl OverallSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// Critical and high results are handed to the notification layer.
    pub fn warrants_escalation(&self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }
}

impl From<Severity> for OverallSeverity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Self::Critical,
            Severity::High => Self::High,
            Severity::Medium => Self::Medium,
            Severity::Low => Self::Low,
        }
    }
}

impl std::fmt::Display for OverallSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one analysis call, returned to the caller and persisted as an incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub pipeline_id: String,
    pub status: RunStatus,
    /// Detection order, stable across runs.
    pub anomalies: Vec<Anomaly>,
    pub severity: OverallSeverity,
    pub recommendation: String,
    pub escalate_to_supervisor: bool,
    pub timestamp: DateTime<Utc>,
}
