use axum::{response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::VERSION;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Health check endpoint
///
/// GET /health
pub async fn health_check() -> impl IntoResponse {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        version: VERSION.to_string(),
        timestamp: Utc::now(),
    })
}
