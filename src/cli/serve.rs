use crate::cli::commands::ServeArgs;
use crate::errors::GuardianError;
use crate::api;
use tracing::info;

pub async fn handle_serve(args: ServeArgs) -> Result<(), GuardianError> {
    let (config, config_loaded) = super::load_config(args.config.as_deref()).await?;
    info!(host = %args.host, port = args.port, config_loaded, "Starting CI/CD Guardian");

    let state = api::create_app_state(&config, config_loaded).await?;
    let app = api::build_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GuardianError::Internal(format!("Server error: {}", e)))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
