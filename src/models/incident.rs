use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use super::analysis::AnalysisResult;

/// A persisted analysis. Append-only: never updated after insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub branch: String,
    pub commit_sha: String,
    pub duration_seconds: f64,
    #[serde(flatten)]
    pub result: AnalysisResult,
}
