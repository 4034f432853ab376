use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};
use crate::api::models::IncidentQuery;
use crate::api::AppState;
use crate::errors::GuardianError;

const DEFAULT_INCIDENT_LIMIT: usize = 20;
const MAX_INCIDENT_LIMIT: usize = 100;

pub async fn get_metrics(State(state): State<AppState>) -> Result<Json<Value>, GuardianError> {
    let snapshot = state.analyzer.metrics().await?;
    let stm = state.analyzer.stm_state().await;

    let mut body = serde_json::to_value(&snapshot)?;
    body["last_analysis_timestamp"] = json!(stm.last_analyzed);
    Ok(Json(body))
}

pub async fn list_incidents(
    State(state): State<AppState>,
    Query(query): Query<IncidentQuery>,
) -> Result<Json<Value>, GuardianError> {
    let limit = query.limit.unwrap_or(DEFAULT_INCIDENT_LIMIT).min(MAX_INCIDENT_LIMIT);
    let incidents = state.analyzer.recent_incidents(limit).await?;
    Ok(Json(json!({ "incidents": incidents, "total": incidents.len() })))
}
