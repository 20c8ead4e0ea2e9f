use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use brandkit_client::{LlmConfig, OpenAiBackend, ReqwestFetcher};
use brandkit_core::{MemoryStore, PipelineConfig};
use brandkit_db::{AnyStore, Database, DatabaseConfig};
use brandkit_server::routes;
use brandkit_server::state::{AppState, build_pipeline};

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("brandkit=info".parse()?))
        .with_target(false)
        .init();

    let api_key = std::env::var("BRANDKIT_SERVER_API_KEY")
        .context("BRANDKIT_SERVER_API_KEY must be set")?;
    let port = std::env::var("BRANDKIT_SERVER_PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");

    let store = match DatabaseConfig::from_env_optional()? {
        Some(config) => {
            let db = Database::connect(&config).await?;
            db.migrate().await?;
            AnyStore::from(db.project_repo())
        }
        None => {
            tracing::warn!("DATABASE_URL not set, projects are kept in memory only");
            AnyStore::from(MemoryStore::new())
        }
    };

    let backend = OpenAiBackend::from_config(&LlmConfig::from_env()?)?;
    let pipeline = build_pipeline(
        store,
        ReqwestFetcher::new()?,
        backend,
        PipelineConfig::from_env()?,
    );

    let recovered = pipeline.recover_interrupted().await?;
    if recovered > 0 {
        tracing::info!(recovered, "Settled projects interrupted by the last shutdown");
    }

    let state = Arc::new(AppState::new(pipeline, api_key));

    let app = routes::router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for CTRL+C");
    }
    tracing::info!("Shutdown signal received");
}
