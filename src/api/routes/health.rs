use axum::{extract::State, Json};
use crate::api::models::{HealthResponse, MemoryStatus};
use crate::api::AppState;

fn tier(ok: bool) -> &'static str {
    if ok { "ok" } else { "degraded" }
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.analyzer.status();
    let uptime = state.started_at.elapsed().as_secs_f64();

    Json(HealthResponse {
        status: if status.stm_ok && status.ltm_ok { "healthy" } else { "degraded" },
        memory_status: MemoryStatus {
            stm: tier(status.stm_ok),
            ltm: tier(status.ltm_ok),
        },
        config_loaded: state.config_loaded,
        uptime_seconds: (uptime * 100.0).round() / 100.0,
    })
}
