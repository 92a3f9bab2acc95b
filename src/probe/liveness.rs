use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// In-memory liveness flag
///
/// Starts LIVE and only changes through `toggle()`. Once DOWN it stays DOWN,
/// so the orchestrator's liveness probe eventually restarts the container.
#[derive(Debug, Clone)]
pub struct LivenessToggle {
    live: Arc<AtomicBool>,
}

impl LivenessToggle {
    /// Create a new liveness flag (initially live)
    pub fn new() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Flip the flag and return the new state
    ///
    /// Load and store are separate steps; concurrent toggles may lose an update.
    pub fn toggle(&self) -> bool {
        let next = !self.live.load(Ordering::SeqCst);
        self.live.store(next, Ordering::SeqCst);
        next
    }
}

impl Default for LivenessToggle {
    fn default() -> Self {
        Self::new()
    }
}
