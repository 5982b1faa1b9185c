use std::net::SocketAddr;
use std::sync::Arc;

use originality_core::{AnalysisStore, Pipeline, SqliteStore, config_file};
use tracing_subscriber::EnvFilter;

mod app;
mod error;
mod handlers;
mod models;
mod state;

use state::AppState;

const DEFAULT_ADDR: &str = "0.0.0.0:5001";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = config_file::resolve_config();
    tracing::debug!(?config, "resolved configuration");

    let store: Arc<dyn AnalysisStore> = match &config.store_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "opening analysis store");
            Arc::new(SqliteStore::open(path)?)
        }
        None => {
            tracing::warn!("no store path configured; analyses are kept in memory");
            Arc::new(SqliteStore::open_in_memory()?)
        }
    };

    let pipeline = Pipeline::from_config(&config);
    let state = Arc::new(AppState {
        store,
        pipeline,
        config,
    });

    let addr: SocketAddr = std::env::var("ORIGINALITY_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;
    tracing::info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app::router(state)).await?;

    Ok(())
}
