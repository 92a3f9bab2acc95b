//! Graceful shutdown handling
//!
//! Shutdown is triggered either by `/shutdown` or by SIGTERM/SIGINT:
//! - The server stops accepting connections and drains in-flight requests
//! - The readiness marker is removed before the process exits
//!
//! A forceful kill (SIGKILL) skips all of this.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Receiving half of the shutdown channel
#[derive(Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait for shutdown signal
    pub async fn wait(&mut self) {
        while !*self.receiver.borrow() {
            if self.receiver.changed().await.is_err() {
                // Sender dropped, treat as shutdown
                break;
            }
        }
    }

    /// Check if shutdown was signaled (non-blocking)
    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Controller for triggering shutdown; clones trigger the same channel
#[derive(Clone)]
pub struct ShutdownController {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownController {
    /// Trigger shutdown
    pub fn shutdown(&self) {
        let _ = self.sender.send(true);
        info!("Shutdown signal sent");
    }
}

/// Create a new shutdown signal pair
///
/// Returns (controller, signal) where:
/// - controller: shared with request handlers and the signal listener
/// - signal: handed to the server's graceful shutdown future
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (
        ShutdownController {
            sender: Arc::new(sender),
        },
        ShutdownSignal { receiver },
    )
}

/// Wait for SIGTERM or SIGINT signal
///
/// Returns the signal name that was received.
#[cfg(unix)]
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    info!(
        signal = name,
        ">>>> SHUTDOWN HOOK called. Possibly because of a SIGTERM from Kubernetes"
    );
    Ok(name)
}

/// Wait for Ctrl+C signal (Windows)
#[cfg(not(unix))]
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    info!(">>>> SHUTDOWN HOOK called on Ctrl+C");
    Ok("CTRL_C")
}

/// Forward the first termination signal to `controller`
pub async fn forward_signals(controller: ShutdownController) {
    match wait_for_signal().await {
        Ok(_) => controller.shutdown(),
        Err(e) => tracing::error!(error = %e, "Failed to register termination signal handlers"),
    }
}
