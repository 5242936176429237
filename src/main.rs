use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use csvsight::api::{build_router, ApiContext};
use csvsight::config::{self, Config};
use csvsight::db::ReportStore;
use csvsight::pipeline::GeminiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = Config::from_env();
    let store = ReportStore::open(&config.database_path)?;
    tracing::info!(path = %config.database_path.display(), "database ready");

    let llm = GeminiClient::from_config(&config)?;
    tracing::info!(model = llm.model(), "Gemini client configured");

    let app = build_router(ApiContext::new(store, Arc::new(llm)));

    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str()).await?;
    tracing::info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
