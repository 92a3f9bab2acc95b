use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Readiness state materialized as a marker file
///
/// The file existing means READY. Clones refer to the same path, so any
/// clone observes changes made through another.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    marker: PathBuf,
}

impl ReadinessGate {
    pub fn new(marker: impl Into<PathBuf>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &Path {
        &self.marker
    }

    /// Check whether the marker exists
    pub fn is_ready(&self) -> bool {
        self.marker.exists()
    }

    /// Remove the marker; a missing marker is not an error
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.marker) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Create the marker, truncating it if it already exists
    pub fn set_ready(&self) -> io::Result<()> {
        File::create(&self.marker).map(|_| ())
    }

    /// Flip the marker and return the new state
    pub fn toggle(&self) -> io::Result<bool> {
        if self.is_ready() {
            self.clear()?;
            Ok(false)
        } else {
            self.set_ready()?;
            Ok(true)
        }
    }

    /// Mark ready after startup, tolerating an unwritable marker location
    ///
    /// Running outside a cluster the marker directory usually doesn't exist
    /// or isn't writable; the service keeps running without readiness.
    pub fn mark_ready_after_startup(&self) {
        match self.set_ready() {
            Ok(()) => info!(marker = %self.marker.display(), "Readiness marker created"),
            Err(e) => warn!(
                marker = %self.marker.display(),
                error = %e,
                "Can't create readiness marker used by the readiness check. Possibly running locally, so ignoring it"
            ),
        }
    }

    /// Best-effort retraction during graceful shutdown
    pub fn clear_on_shutdown(&self) {
        match self.clear() {
            Ok(()) => info!(marker = %self.marker.display(), "Readiness marker removed"),
            Err(e) => warn!(
                marker = %self.marker.display(),
                error = %e,
                "Failed to remove readiness marker during shutdown"
            ),
        }
    }
}
