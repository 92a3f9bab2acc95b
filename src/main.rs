use anyhow::Context;
use random_generator::config::Config;
use random_generator::probe::ReadinessGate;
use random_generator::random::ProcessId;
use random_generator::server::{forward_signals, serve, shutdown_channel, AppState};
use random_generator::startup::{self, POST_START_POLL_INTERVAL};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    let id = ProcessId::generate();
    info!(
        id = %id,
        version = %config.version,
        pattern = %config.pattern,
        "Starting random generator"
    );

    startup::post_start_gate(&config, POST_START_POLL_INTERVAL)
        .await
        .context("postStart gate failed")?;

    // Termination signals are forwarded from here on
    let (shutdown_controller, shutdown_signal) = shutdown_channel();
    tokio::spawn(forward_signals(shutdown_controller.clone()));

    // A fresh process is never ready, whatever a previous one left behind
    let readiness = ReadinessGate::new(config.ready_file.clone());
    if let Err(e) = readiness.clear() {
        warn!(error = %e, marker = %readiness.marker().display(), "Failed to clear readiness marker");
    }

    startup::delay_if_requested(config.delay_startup).await;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let state = AppState::new(config, id, shutdown_controller);
    serve(listener, state, shutdown_signal)
        .await
        .context("server failed")?;

    info!("Random generator shut down gracefully");
    Ok(())
}
