//! Health check handler.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub backend: String,
    pub storage: String,
}

/// Liveness plus a storage round trip. Storage trouble degrades the report but never
/// fails the probe.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(5);

    let storage_status = match tokio::time::timeout(TIMEOUT, state.files.check_storage()).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Storage health check warning");
            format!("degraded: {}", e)
        }
        Err(_) => {
            tracing::warn!("Storage health check timed out");
            "timeout".to_string()
        }
    };

    (
        StatusCode::OK,
        Json(HealthCheckResponse {
            status: "ok".to_string(),
            backend: state.files.backend_type().to_string(),
            storage: storage_status,
        }),
    )
}
