//! Shared random value generator and its audit log
//!
//! One generator serves the whole process. It starts with an entropy seed
//! and can be reseeded exactly once after startup, which makes the value
//! sequence reproducible across replicas started with the same seed.

pub mod log;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

pub use log::{FileSink, HttpSink, LogRecord, LogSink, LogSinkError, RandomLog};

/// Identity of this process instance, fixed for its lifetime
///
/// Lets clients tell replicas apart behind a load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(Uuid);

impl ProcessId {
    pub fn generate() -> Self {
        ProcessId(Uuid::new_v4())
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Process-wide generator handle; clones share the same generator
#[derive(Debug, Clone)]
pub struct RandomService {
    id: ProcessId,
    rng: Arc<Mutex<StdRng>>,
    seeded: Arc<AtomicBool>,
}

impl RandomService {
    /// Create an unseeded generator
    pub fn new(id: ProcessId) -> Self {
        Self {
            id,
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
            seeded: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Replace the generator with one seeded from `seed`
    ///
    /// A zero seed keeps the entropy-seeded generator. Only the first call
    /// has any effect; returns whether the generator was reseeded.
    pub fn init_seed(&self, seed: u64) -> bool {
        if seed == 0 || self.seeded.swap(true, Ordering::SeqCst) {
            return false;
        }
        *self.lock() = StdRng::seed_from_u64(seed);
        true
    }

    /// Draw the next value
    pub fn next_value(&self) -> i32 {
        self.lock().gen::<i32>()
    }

    /// Draw and discard `count` values while holding the generator
    pub fn discard(&self, count: u64) {
        let mut rng = self.lock();
        for _ in 0..count {
            std::hint::black_box(rng.next_u32());
        }
    }

    /// Fill `buf` with random bytes
    pub fn fill_bytes(&self, buf: &mut [u8]) {
        self.lock().fill_bytes(buf);
    }

    // A panic mid-draw leaves the generator in a usable state
    fn lock(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
#[path = "random_test.rs"]
mod tests;

#[cfg(test)]
#[path = "log_test.rs"]
mod log_tests;
