//! HTTP server setup and routing

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api;
use crate::state::AppState;

/// Build the discovery API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/discover", post(api::discover))
        .route("/health", get(api::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the discovery API until the process exits
pub async fn run(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, "Starting discovery handler");
    axum::serve(listener, app).await?;
    Ok(())
}
