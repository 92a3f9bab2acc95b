//! Workload endpoints
//!
//! Every route accepts any method. Handlers that block (CPU burn, memory
//! fill, file access) run on the blocking pool so each gets a thread of
//! its own.

use super::{health, AppState};
use crate::random::log::read_log_file;
use crate::random::LogRecord;
use crate::sysinfo::{self, SysInfoError};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

/// Errors that fail a single request
#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SysInfo(#[from] SysInfoError),

    #[error("request task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(error = %self, "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct RandomParams {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub burn: Option<i64>,
}

/// `?burn=` with no value means "no burn"; anything else must be an integer
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RandomResponse {
    pub random: i32,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct MemoryParams {
    pub mb: usize,
}

/// Draw a value, optionally burning CPU first, and log it
async fn random_value(
    State(state): State<AppState>,
    Query(params): Query<RandomParams>,
) -> Result<Json<RandomResponse>, AppError> {
    let start = Instant::now();

    let stressor = state.stressor.clone();
    let random = state.random.clone();
    let value = tokio::task::spawn_blocking(move || {
        stressor.burn_cpu(params.burn);
        random.next_value()
    })
    .await?;

    let id = state.random.id();
    state
        .log
        .log_value(&LogRecord::new(id, start.elapsed(), value))
        .await;

    Ok(Json(RandomResponse {
        random: value,
        id: id.to_string(),
    }))
}

async fn memory_eater(
    State(state): State<AppState>,
    Query(params): Query<MemoryParams>,
) -> Result<StatusCode, AppError> {
    let stressor = state.stressor.clone();
    tokio::task::spawn_blocking(move || stressor.eat_memory(params.mb)).await?;
    Ok(StatusCode::OK)
}

async fn toggle_live(State(state): State<AppState>) -> StatusCode {
    let live = state.liveness.toggle();
    info!(live, "Liveness toggled");
    StatusCode::OK
}

async fn toggle_ready(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let ready = state.readiness.toggle()?;
    info!(ready, "Readiness toggled");
    Ok(StatusCode::OK)
}

async fn info(State(state): State<AppState>) -> Result<Json<Map<String, Value>>, AppError> {
    let config = state.config.clone();
    let id = state.random.id();
    let snapshot = tokio::task::spawn_blocking(move || sysinfo::collect(&config, id)).await??;
    Ok(Json(snapshot))
}

async fn shutdown(State(state): State<AppState>) -> StatusCode {
    info!("SHUTDOWN NOW");
    state.shutdown.shutdown();
    StatusCode::OK
}

/// Log file contents as plain text, empty without a log file
async fn logs(State(state): State<AppState>) -> Result<String, AppError> {
    let Some(path) = state.config.log_file.clone() else {
        return Ok(String::new());
    };
    let contents = tokio::task::spawn_blocking(move || read_log_file(&path)).await??;
    Ok(contents)
}

/// Build the router for all endpoints
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", any(random_value))
        .route("/memory-eater", any(memory_eater))
        .route("/toggle-live", any(toggle_live))
        .route("/toggle-ready", any(toggle_ready))
        .route("/info", any(info))
        .route("/shutdown", any(shutdown))
        .route("/logs", any(logs))
        .route("/actuator/health", any(health::health))
        .with_state(state)
}
