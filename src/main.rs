//! Citation validator - checks that a manuscript's numbered citations point at
//! sources that actually support the citing claims.
//!
//! This is the main entry point for the validation server.
//! The application is organized into the following modules:
//!
//! - `references`, `occurrences`, `context`: manuscript extraction
//! - `archive`, `resolver`: cited-document download and caching
//! - `sections`, `embeddings`, `scorer`: section-level support scoring
//! - `checklist`, `suggestions`, `alternatives`: verdicts and advice
//! - `pipeline`: the per-manuscript orchestrator
//! - `handlers`, `store`: HTTP routes and the report cache

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use citecheck::{config::Config, handlers, AppState};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,citecheck=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let state = Arc::new(AppState::from_config(&config)?);

    let app = Router::new()
        .route("/health", get(handlers::health))
        // Validation routes
        .route("/api/citations/validate", post(handlers::validate_citations))
        .route("/api/citations/{file_tag}", get(handlers::get_report))
        // Alternative source index
        .route("/api/sources", post(handlers::index_source))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    tracing::info!("Citation validator running at http://{}", config.bind_addr);
    tracing::info!(storage = %config.storage_root.display(), "Document cache");
    tracing::info!(indexed = state.sources.len(), "Alternative source index loaded");
    if config.embedding_api_key.is_none() {
        tracing::warn!("EMBEDDING_API_KEY not set; embedding requests are sent unauthenticated");
    }

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
