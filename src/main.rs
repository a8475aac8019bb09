use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use kb_agent_backend::core::config::{AppPaths, ConfigService};
use kb_agent_backend::core::logging;
use kb_agent_backend::server;
use kb_agent_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    let config_service = ConfigService::new(paths.clone());
    let state = AppState::initialize(&config_service).context("Startup failed")?;

    let log_config = &state.config.logging;
    logging::init(&paths.resolve(Path::new(&log_config.dir)), &log_config.level);

    let redacted = config_service.redact_sensitive_values(&config_service.load_raw());
    tracing::debug!("Effective configuration: {}", redacted);

    let bind_addr = state.config.server.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!(
        kb = %state.config.nuclia.kb,
        model = %state.config.llm.model,
        "Listening on {}",
        addr
    );

    let app: Router = server::router::router(state.clone());
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
