use std::path::Path;
use crate::analysis::Analyzer;
use crate::cli::commands::AnalyzeArgs;
use crate::errors::GuardianError;
use crate::models::{PipelineReport, PipelineReportInput};
use crate::notify::NotificationDispatcher;

pub async fn handle_analyze(args: AnalyzeArgs) -> Result<(), GuardianError> {
    let (config, _) = super::load_config(args.config.as_deref()).await?;
    let report = read_report(Path::new(&args.report)).await?;

    let analyzer = Analyzer::open(&config).await?;
    let result = analyzer.analyze(&report).await?;

    let notifier = NotificationDispatcher::from_config(&config.policy.notifications)?;
    notifier.dispatch(&result).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub async fn read_report(path: &Path) -> Result<PipelineReport, GuardianError> {
    let content = tokio::fs::read_to_string(path).await?;
    let body: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| GuardianError::validation("body", e.to_string()))?;
    PipelineReport::try_from(PipelineReportInput::from_json(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunStatus;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_report_parses_and_validates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, r#"{
            "pipeline_id": "build-1", "status": "FAILED", "duration_seconds": 30,
            "branch": "main", "commit_sha": "abc"
        }"#).unwrap();

        let report = read_report(&path).await.unwrap();
        assert_eq!(report.status, RunStatus::Failed);
        assert!(!report.is_direct_push);
    }

    #[tokio::test]
    async fn test_read_report_rejects_bad_status() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, r#"{
            "pipeline_id": "build-1", "status": "paused", "duration_seconds": 30,
            "branch": "main", "commit_sha": "abc"
        }"#).unwrap();

        let err = read_report(&path).await.unwrap_err();
        assert_eq!(err.field(), Some("status"));
    }

    #[tokio::test]
    async fn test_read_report_names_missing_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, r#"{
            "pipeline_id": "build-1", "status": "success", "duration_seconds": 30,
            "commit_sha": "abc"
        }"#).unwrap();

        let err = read_report(&path).await.unwrap_err();
        assert_eq!(err.field(), Some("branch"));
    }

    #[tokio::test]
    async fn test_read_report_unparseable_json_is_body_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = read_report(&path).await.unwrap_err();
        assert_eq!(err.field(), Some("body"));
    }
}
