//! Discovery API handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use warden_core::DiscoveryDetails;

use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// Run a discovery scan and return host device records
pub async fn discover(
    State(state): State<Arc<AppState>>,
    Json(details): Json<DiscoveryDetails>,
) -> impl IntoResponse {
    match state.scanner.discover(&details).await {
        Ok(report) => Json(report.records()).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(ApiError::new(e.to_string()))).into_response(),
    }
}

/// Liveness check
pub async fn health() -> &'static str {
    "ok"
}
