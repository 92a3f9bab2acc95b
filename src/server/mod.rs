//! HTTP server and process lifecycle
//!
//! Serving sequence:
//! 1. Bind the listener and start accepting connections
//! 2. Run the post-ready steps: log resources, create the readiness
//!    marker, apply the configured seed
//! 3. Serve until `/shutdown` or a termination signal
//! 4. Drain, then remove the readiness marker
//!
//! Step 2 runs after the listener is live, so the first requests may still
//! see NOT_READY and the unseeded generator.

mod health;
pub mod routes;
pub mod shutdown;

pub use health::HealthStatus;
pub use routes::{build_router, AppError, RandomResponse};
pub use shutdown::{
    forward_signals, shutdown_channel, wait_for_signal, ShutdownController, ShutdownSignal,
};

use crate::config::Config;
use crate::probe::{LivenessToggle, ReadinessGate};
use crate::random::{ProcessId, RandomLog, RandomService};
use crate::stress::ResourceStressor;
use crate::sysinfo::{self, MemoryStats};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Process-wide state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub random: RandomService,
    pub log: Arc<RandomLog>,
    pub stressor: ResourceStressor,
    pub readiness: ReadinessGate,
    pub liveness: LivenessToggle,
    pub shutdown: ShutdownController,
}

impl AppState {
    /// Build state with log sinks taken from `config`
    pub fn new(config: Config, id: ProcessId, shutdown: ShutdownController) -> Self {
        let log = RandomLog::from_config(&config);
        Self::with_log(config, id, log, shutdown)
    }

    pub fn with_log(
        config: Config,
        id: ProcessId,
        log: RandomLog,
        shutdown: ShutdownController,
    ) -> Self {
        let random = RandomService::new(id);
        Self {
            readiness: ReadinessGate::new(config.ready_file.clone()),
            stressor: ResourceStressor::new(random.clone()),
            liveness: LivenessToggle::new(),
            log: Arc::new(log),
            config: Arc::new(config),
            random,
            shutdown,
        }
    }
}

/// Post-ready steps, in order
pub fn on_ready(state: &AppState) {
    sysinfo::dump(MemoryStats::current(), sysinfo::available_processors());

    state.readiness.mark_ready_after_startup();

    if state.random.init_seed(state.config.seed) {
        info!(seed = state.config.seed, "Random generator seeded");
    }
}

/// Serve on `listener` until shutdown is signaled
///
/// Removes the readiness marker once the server has drained.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown: ShutdownSignal,
) -> Result<(), std::io::Error> {
    let app = build_router(state.clone());
    let addr = listener.local_addr()?;

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await
    });
    // Log after successful bind - server is actually listening
    info!(%addr, id = %state.random.id(), "Random generator listening (HTTP)");

    on_ready(&state);

    finish_serving(&state.readiness, server.await)
}

/// Retract readiness, then report how the server task ended
///
/// The marker is removed even when the task panicked or was cancelled.
fn finish_serving(
    readiness: &ReadinessGate,
    joined: Result<Result<(), std::io::Error>, tokio::task::JoinError>,
) -> Result<(), std::io::Error> {
    readiness.clear_on_shutdown();
    info!("Server stopped");
    joined.map_err(std::io::Error::other)?
}

#[cfg(test)]
#[path = "test_support.rs"]
mod test_support;

#[cfg(test)]
#[path = "health_test.rs"]
mod health_tests;

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_tests;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;
