//! Probe state exposed to the orchestrator
//!
//! - Readiness is a marker file: the orchestrator runs an exec probe that
//!   checks whether the file exists.
//! - Liveness is an in-memory flag reported by `/actuator/health`.
//!
//! Neither is synchronized across concurrent toggles. A racing pair of
//! toggles lands on one of the two valid states.

mod liveness;
mod readiness;

pub use liveness::LivenessToggle;
pub use readiness::ReadinessGate;

#[cfg(test)]
#[path = "readiness_test.rs"]
mod readiness_tests;

#[cfg(test)]
#[path = "liveness_test.rs"]
mod liveness_tests;
