//! Startup gate run before the listener is bound
//!
//! The container's postStart hook may still be running when the process
//! starts. When asked to, wait for the hook's marker file. The optional
//! fixed delay is applied afterwards, once the readiness marker is cleared.

use crate::config::Config;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Interval between checks for the postStart marker
pub const POST_START_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read postStart marker {path}: {source}")]
    PostStartMarker {
        path: String,
        source: std::io::Error,
    },
}

/// Block until `marker` exists, then return its contents
///
/// There is no timeout; the orchestrator either creates the file or kills
/// the container.
pub async fn wait_for_post_start(
    marker: &Path,
    poll_interval: Duration,
) -> Result<String, StartupError> {
    while !marker.exists() {
        info!(marker = %marker.display(), "Waiting for postStart to be finished ....");
        tokio::time::sleep(poll_interval).await;
    }
    let contents = tokio::fs::read(marker)
        .await
        .map_err(|source| StartupError::PostStartMarker {
            path: marker.display().to_string(),
            source,
        })?;
    let message = String::from_utf8_lossy(&contents).into_owned();
    info!(message = %message, "postStart Message");
    Ok(message)
}

/// Wait for the postStart marker when `WAIT_FOR_POST_START` asks for it
pub async fn post_start_gate(config: &Config, poll_interval: Duration) -> Result<(), StartupError> {
    if config.wait_for_post_start {
        wait_for_post_start(&config.post_start_file, poll_interval).await?;
    } else {
        info!("No WAIT_FOR_POST_START configured");
    }
    Ok(())
}

/// Sleep for the configured startup delay, if any
pub async fn delay_if_requested(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    info!(seconds = delay.as_secs(), "Delaying startup");
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
#[path = "startup_test.rs"]
mod tests;
