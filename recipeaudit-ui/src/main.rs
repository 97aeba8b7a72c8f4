//! Recipeaudit web shell — serve the upload-and-audit page over HTTP.

use recipeaudit_ui::{AppState, router};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Set up tracing: human-readable stderr + JSON file logging
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let log_dir = directories::ProjectDirs::from("dev", "recipeaudit", "recipeaudit")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "recipeaudit-ui.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    // An unusable backend is fatal at startup, not at request time.
    let workspace = std::env::current_dir().ok();
    let config = recipeaudit_core::load_config(workspace.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    config.validate()?;

    let addr = format!("{}:{}", config.ui.host, config.ui.port);
    let pipeline = recipeaudit_core::AuditPipeline::from_config(config)?;
    let app = router(AppState::new(Arc::new(pipeline)));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Recipe audit shell listening");
    axum::serve(listener, app).await?;

    Ok(())
}
