//! On-demand CPU and memory pressure
//!
//! Both operations run to completion once started. Memory retention is not
//! capped: the point is to let the container's memory limit kill the
//! process when asked to.

use crate::random::RandomService;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Upper bound for a burn request, in units
pub const MAX_BURN_UNITS: u64 = 10_000;

/// Generator draws per burn unit
pub const DRAWS_PER_UNIT: u64 = 1_000_000;

const MIB: usize = 1024 * 1024;

/// Number of units a burn request actually performs
///
/// Absent and non-positive requests burn nothing; large ones are clamped.
pub fn burn_units(requested: Option<i64>) -> u64 {
    match requested {
        Some(units) if units > 0 => (units as u64).min(MAX_BURN_UNITS),
        _ => 0,
    }
}

/// CPU burner and holder of the single retained memory buffer
#[derive(Debug, Clone)]
pub struct ResourceStressor {
    random: RandomService,
    hole: Arc<Mutex<Option<Vec<u8>>>>,
}

impl ResourceStressor {
    pub fn new(random: RandomService) -> Self {
        Self {
            random,
            hole: Arc::new(Mutex::new(None)),
        }
    }

    /// Burn CPU by drawing from the shared generator; blocks the calling thread
    ///
    /// The generator is released between units so concurrent requests can
    /// still draw values. Returns the number of units burned.
    pub fn burn_cpu(&self, requested: Option<i64>) -> u64 {
        let units = burn_units(requested);
        if units == 0 {
            return 0;
        }
        info!(units, id = %self.random.id(), "Burning CPU");
        for _ in 0..units {
            self.random.discard(DRAWS_PER_UNIT);
        }
        units
    }

    /// Allocate `megabytes` MiB of random bytes and retain them
    ///
    /// The previous buffer is released before the new one is allocated, so
    /// at most one buffer is ever held.
    pub fn eat_memory(&self, megabytes: usize) {
        let bytes = megabytes.saturating_mul(MIB);
        {
            let mut hole = self.lock_hole();
            *hole = None;
        }

        // Random fill forces the pages to be backed
        let mut buffer = vec![0u8; bytes];
        self.random.fill_bytes(&mut buffer);

        info!(megabytes, id = %self.random.id(), "Retaining memory");
        *self.lock_hole() = Some(buffer);
    }

    /// Size of the retained buffer in bytes
    pub fn retained_bytes(&self) -> usize {
        self.lock_hole().as_ref().map_or(0, Vec::len)
    }

    fn lock_hole(&self) -> std::sync::MutexGuard<'_, Option<Vec<u8>>> {
        self.hole.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
#[path = "stress_test.rs"]
mod tests;
