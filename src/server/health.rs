//! Liveness health endpoint polled by the orchestrator
//!
//! - `/actuator/health` - 200 `{"status":"UP"}` while live, 503 `{"status":"DOWN"}` otherwise
//!
//! Readiness has no endpoint: the orchestrator checks the marker file directly.

use super::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: &'static str,
}

/// Liveness probe handler
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    if state.liveness.is_live() {
        (StatusCode::OK, Json(HealthStatus { status: "UP" }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthStatus { status: "DOWN" }),
        )
    }
}
