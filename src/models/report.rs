use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::errors::GuardianError;

/// Outcome of the CI/CD run being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
    Aborted,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = GuardianError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "aborted" => Ok(Self::Aborted),
            other => Err(GuardianError::validation(
                "status",
                format!("unknown run status '{}', expected success, failed or aborted", other),
            )),
        }
    }
}

/// A normalized report of one CI/CD run. Immutable for the lifetime of one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub pipeline_id: String,
    pub status: RunStatus,
    pub duration_seconds: f64,
    #[serde(default)]
    pub logs: String,
    /// Vulnerability identifiers such as CVE ids.
    #[serde(default)]
    pub vulnerabilities: Vec<String>,
    pub branch: String,
    pub commit_sha: String,
    /// Absent when the run produced no coverage report.
    #[serde(default)]
    pub test_coverage_percent: Option<f64>,
    #[serde(default)]
    pub is_direct_push: bool,
    /// Absent when the run was not tied to a pull request.
    #[serde(default)]
    pub pr_approved: Option<bool>,
    #[serde(default)]
    pub pr_reviewers_count: Option<u32>,
}

impl PipelineReport {
    /// Check structural constraints, naming the first offending field.
    pub fn validate(&self) -> Result<(), GuardianError> {
        if self.pipeline_id.trim().is_empty() {
            return Err(GuardianError::validation("pipeline_id", "must not be empty"));
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds < 0.0 {
            return Err(GuardianError::validation(
                "duration_seconds",
                format!("must be a non-negative number, got {}", self.duration_seconds),
            ));
        }
        if self.branch.trim().is_empty() {
            return Err(GuardianError::validation("branch", "must not be empty"));
        }
        if self.commit_sha.trim().is_empty() {
            return Err(GuardianError::validation("commit_sha", "must not be empty"));
        }
        if let Some(coverage) = self.test_coverage_percent {
            if !coverage.is_finite() || !(0.0..=100.0).contains(&coverage) {
                return Err(GuardianError::validation(
                    "test_coverage_percent",
                    format!("must be between 0 and 100, got {}", coverage),
                ));
            }
        }
        Ok(())
    }
}

/// Loosely typed report as submitted by a caller, before boundary validation.
#[derive(Debug, Clone, Default)]
pub struct PipelineReportInput {
    pub pipeline_id: Option<String>,
    pub status: Option<String>,
    pub duration_seconds: Option<f64>,
    pub logs: Option<String>,
    pub vulnerabilities: Option<Vec<String>>,
    pub branch: Option<String>,
    pub commit_sha: Option<String>,
    pub test_coverage_percent: Option<f64>,
    pub is_direct_push: Option<bool>,
    pub pr_approved: Option<bool>,
    pub pr_reviewers_count: Option<i64>,
}

impl PipelineReportInput {
    /// Decode a JSON object one field at a time, so a type mismatch is
    /// reported against the field it came from. Unknown keys are ignored.
    pub fn from_json(value: Value) -> Result<Self, GuardianError> {
        let Value::Object(mut fields) = value else {
            return Err(GuardianError::validation("body", "expected a JSON object"));
        };
        Ok(Self {
            pipeline_id: take(&mut fields, "pipeline_id")?,
            status: take(&mut fields, "status")?,
            duration_seconds: take(&mut fields, "duration_seconds")?,
            logs: take(&mut fields, "logs")?,
            vulnerabilities: take(&mut fields, "vulnerabilities")?,
            branch: take(&mut fields, "branch")?,
            commit_sha: take(&mut fields, "commit_sha")?,
            test_coverage_percent: take(&mut fields, "test_coverage_percent")?,
            is_direct_push: take(&mut fields, "is_direct_push")?,
            pr_approved: take(&mut fields, "pr_approved")?,
            pr_reviewers_count: take(&mut fields, "pr_reviewers_count")?,
        })
    }
}

/// Null and absent are the same thing.
fn take<T: DeserializeOwned>(fields: &mut Map<String, Value>, name: &str) -> Result<Option<T>, GuardianError> {
    match fields.remove(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| GuardianError::validation(name, e.to_string())),
    }
}

fn required<T>(value: Option<T>, name: &str) -> Result<T, GuardianError> {
    value.ok_or_else(|| GuardianError::validation(name, "is required"))
}

impl TryFrom<PipelineReportInput> for PipelineReport {
    type Error = GuardianError;

    fn try_from(input: PipelineReportInput) -> Result<Self, Self::Error> {
        let status: RunStatus = required(input.status, "status")?.parse()?;
        let pr_reviewers_count = match input.pr_reviewers_count {
            Some(n) if n < 0 => {
                return Err(GuardianError::validation(
                    "pr_reviewers_count",
                    format!("must be non-negative, got {}", n),
                ));
            }
            Some(n) => Some(u32::try_from(n).map_err(|_| {
                GuardianError::validation("pr_reviewers_count", format!("{} is out of range", n))
            })?),
            None => None,
        };

        let report = PipelineReport {
            pipeline_id: required(input.pipeline_id, "pipeline_id")?,
            status,
            duration_seconds: required(input.duration_seconds, "duration_seconds")?,
            logs: input.logs.unwrap_or_default(),
            vulnerabilities: input.vulnerabilities.unwrap_or_default(),
            branch: required(input.branch, "branch")?,
            commit_sha: required(input.commit_sha, "commit_sha")?,
            test_coverage_percent: input.test_coverage_percent,
            is_direct_push: input.is_direct_push.unwrap_or(false),
            pr_approved: input.pr_approved,
            pr_reviewers_count,
        };
        report.validate()?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> PipelineReportInput {
        PipelineReportInput {
            pipeline_id: Some("build-12345".to_string()),
            status: Some("failed".to_string()),
            duration_seconds: Some(450.0),
            logs: Some("Error: Unit tests failed".to_string()),
            vulnerabilities: Some(vec!["CVE-2023-12345".to_string()]),
            branch: Some("main".to_string()),
            commit_sha: Some("a1b2c3d4".to_string()),
            test_coverage_percent: Some(65.0),
            is_direct_push: Some(true),
            pr_approved: Some(false),
            pr_reviewers_count: Some(0),
        }
    }

    #[test]
    fn test_run_status_parse_case_insensitive() {
        assert_eq!("FAILED".parse::<RunStatus>().unwrap(), RunStatus::Failed);
        assert_eq!(" Success ".parse::<RunStatus>().unwrap(), RunStatus::Success);
        assert_eq!("aborted".parse::<RunStatus>().unwrap(), RunStatus::Aborted);
    }

    #[test]
    fn test_unknown_status_names_field() {
        let err = "paused".parse::<RunStatus>().unwrap_err();
        assert_eq!(err.field(), Some("status"));
    }

    #[test]
    fn test_input_converts() {
        let report = PipelineReport::try_from(input()).unwrap();
        assert_eq!(report.status, RunStatus::Failed);
        assert!(report.is_direct_push);
        assert_eq!(report.pr_reviewers_count, Some(0));
    }

    #[test]
    fn test_missing_direct_push_defaults_false() {
        let mut raw = input();
        raw.is_direct_push = None;
        let report = PipelineReport::try_from(raw).unwrap();
        assert!(!report.is_direct_push);
    }

    #[test]
    fn test_negative_reviewers_rejected() {
        let mut raw = input();
        raw.pr_reviewers_count = Some(-1);
        let err = PipelineReport::try_from(raw).unwrap_err();
        assert_eq!(err.field(), Some("pr_reviewers_count"));
    }

    #[test]
    fn test_negative_duration_rejected() {
        let mut raw = input();
        raw.duration_seconds = Some(-1.0);
        let err = PipelineReport::try_from(raw).unwrap_err();
        assert_eq!(err.field(), Some("duration_seconds"));
    }

    #[test]
    fn test_coverage_out_of_range_rejected() {
        let mut raw = input();
        raw.test_coverage_percent = Some(100.5);
        let err = PipelineReport::try_from(raw).unwrap_err();
        assert_eq!(err.field(), Some("test_coverage_percent"));
    }

    #[test]
    fn test_empty_pipeline_id_rejected() {
        let mut raw = input();
        raw.pipeline_id = Some("  ".to_string());
        let err = PipelineReport::try_from(raw).unwrap_err();
        assert_eq!(err.field(), Some("pipeline_id"));
    }

    #[test]
    fn test_deserialize_minimal_report() {
        let report: PipelineReport = serde_json::from_str(
            r#"{"pipeline_id":"p1","status":"success","duration_seconds":12,"branch":"dev","commit_sha":"abc"}"#,
        ).unwrap();
        assert!(report.vulnerabilities.is_empty());
        assert!(report.test_coverage_percent.is_none());
        assert!(!report.is_direct_push);
    }

    #[test]
    fn test_missing_required_field_is_named() {
        let mut raw = input();
        raw.branch = None;
        let err = PipelineReport::try_from(raw).unwrap_err();
        assert_eq!(err.field(), Some("branch"));

        let mut raw = input();
        raw.status = None;
        let err = PipelineReport::try_from(raw).unwrap_err();
        assert_eq!(err.field(), Some("status"));
    }

    #[test]
    fn test_from_json_names_mistyped_field() {
        let err = PipelineReportInput::from_json(serde_json::json!({
            "pipeline_id": "p1",
            "status": "success",
            "duration_seconds": "slow",
            "branch": "dev",
            "commit_sha": "abc"
        })).unwrap_err();
        assert_eq!(err.field(), Some("duration_seconds"));
    }

    #[test]
    fn test_from_json_treats_null_as_missing() {
        let raw = PipelineReportInput::from_json(serde_json::json!({
            "pipeline_id": "p1",
            "status": "success",
            "duration_seconds": 12,
            "branch": "dev",
            "commit_sha": null
        })).unwrap();
        let err = PipelineReport::try_from(raw).unwrap_err();
        assert_eq!(err.field(), Some("commit_sha"));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = PipelineReportInput::from_json(serde_json::json!([1, 2])).unwrap_err();
        assert_eq!(err.field(), Some("body"));
    }
}
