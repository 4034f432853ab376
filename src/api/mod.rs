pub mod routes;
pub mod models;
pub mod errors;

use std::sync::Arc;
use std::time::Instant;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::analysis::Analyzer;
use crate::config::GuardianConfig;
use crate::errors::GuardianError;
use crate::notify::NotificationDispatcher;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub notifier: NotificationDispatcher,
    pub started_at: Instant,
    /// False when running on built-in defaults.
    pub config_loaded: bool,
}

pub async fn create_app_state(
    config: &GuardianConfig,
    config_loaded: bool,
) -> Result<AppState, GuardianError> {
    let analyzer = Analyzer::open(config).await?;
    let notifier = NotificationDispatcher::from_config(&config.policy.notifications)?;
    Ok(AppState {
        analyzer: Arc::new(analyzer),
        notifier,
        started_at: Instant::now(),
        config_loaded,
    })
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::agent::root))
        .route("/api/analyze", post(routes::analyze::analyze_pipeline))
        .route("/api/metrics", get(routes::metrics::get_metrics))
        .route("/api/incidents", get(routes::metrics::list_incidents))
        .route("/api/health", get(routes::health::health_check))
        .route("/api/register", post(routes::agent::register))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
