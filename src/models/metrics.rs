use serde::{Deserialize, Serialize};

/// Occurrence count of one anomaly kind across all stored incidents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: u64,
}

/// Aggregate view over the incident log, always equal to a full recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_pipelines_analyzed: u64,
    pub critical_incidents: u64,
    pub high_severity_incidents: u64,
    pub medium_severity_incidents: u64,
    pub low_severity_incidents: u64,
    pub clean_incidents: u64,
    pub success_rate_percent: f64,
    pub average_duration_seconds: f64,
    pub top_anomalies: Vec<AnomalyCount>,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            total_pipelines_analyzed: 0,
            critical_incidents: 0,
            high_severity_incidents: 0,
            medium_severity_incidents: 0,
            low_severity_incidents: 0,
            clean_incidents: 0,
            success_rate_percent: 100.0,
            average_duration_seconds: 0.0,
            top_anomalies: Vec::new(),
        }
    }
}
