use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;
use crate::api::AppState;
use crate::errors::GuardianError;
use crate::models::{AnalysisResult, PipelineReport, PipelineReportInput};
use tracing::info;

pub async fn analyze_pipeline(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AnalysisResult>, GuardianError> {
    let Json(body) = payload.map_err(|e| GuardianError::validation("body", e.body_text()))?;
    let report = PipelineReport::try_from(PipelineReportInput::from_json(body)?)?;
    info!(pipeline_id = %report.pipeline_id, branch = %report.branch, "Analyzing pipeline");

    let result = state.analyzer.analyze(&report).await?;

    // Delivery runs detached so a slow channel never delays the caller
    if state.notifier.should_notify(&result) {
        let notifier = state.notifier.clone();
        let alert = result.clone();
        tokio::spawn(async move {
            notifier.dispatch(&alert).await;
        });
    }

    Ok(Json(result))
}
