use std::sync::Arc;

use anyhow::{Context, Result};
use lexitrack_core::config::LexitrackConfig;
use lexitrack_core::gateway::{default_sqlite_path, SqliteGateway};
use lexitrack_web::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("LEXITRACK_LOG")
                .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lexitrack_web=info,tower_http=info")),
        )
        .init();

    let cwd = std::env::current_dir().ok();
    let config = LexitrackConfig::load(cwd.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("failed to load config, using defaults: {e}");
        LexitrackConfig::default_config()
    });

    let db_path = match &config.gateway.path {
        Some(p) => std::path::PathBuf::from(p),
        None => default_sqlite_path()?,
    };
    let gateway = SqliteGateway::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;

    let state = Arc::new(AppState::new(gateway, config.web.api_token.clone()));
    if state.api_token.is_none() {
        tracing::warn!("web.api_token is not set, /api routes are unauthenticated");
    }

    let app = lexitrack_web::app(state);

    let addr = format!("{}:{}", config.web.host, config.web.port);
    tracing::info!(db = %db_path.display(), "lexitrack-web listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
