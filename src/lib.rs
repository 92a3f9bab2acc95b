//! Controllable diagnostic workload
//!
//! An HTTP service whose readiness, liveness, CPU load and memory footprint
//! can be driven from outside, for exercising orchestrator probes and
//! resource limits.

pub mod config;
pub mod probe;
pub mod random;
pub mod server;
pub mod startup;
pub mod stress;
pub mod sysinfo;
