//! Service configuration read from environment variables
//!
//! Every knob is a plain environment variable so the workload can be
//! reconfigured from a pod spec without rebuilding the image.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8080;

/// Marker file whose existence signals readiness to the orchestrator
pub const DEFAULT_READY_FILE: &str = "/opt/random-generator-ready";

/// Marker file created by the container's postStart hook
pub const DEFAULT_POST_START_FILE: &str = "/opt/postStart-done";

/// Downward API volume mount holding `labels` and `annotations`
pub const DEFAULT_POD_INFO_DIR: &str = "/pod-info";

/// Pattern name reported when none is configured
pub const DEFAULT_PATTERN: &str = "None";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration of the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub version: String,
    pub log_file: Option<PathBuf>,
    pub log_url: Option<String>,
    pub build_type: Option<String>,
    pub pattern: String,
    /// 0 means "leave the generator unseeded"
    pub seed: u64,
    pub port: u16,
    pub delay_startup: Duration,
    pub wait_for_post_start: bool,
    pub ready_file: PathBuf,
    pub post_start_file: PathBuf,
    pub pod_info_dir: PathBuf,
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let version = get("VERSION").ok_or(ConfigError::Missing("VERSION"))?;

        let seed = match get("SEED") {
            Some(raw) => parse_seed(&raw)?,
            None => 0,
        };

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "PORT",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let delay_secs = match get("DELAY_STARTUP") {
            Some(raw) => raw.parse::<i64>().map_err(|e| ConfigError::Invalid {
                key: "DELAY_STARTUP",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => 0,
        };

        Ok(Config {
            version,
            log_file: get("LOG_FILE").map(PathBuf::from),
            log_url: get("LOG_URL"),
            build_type: get("BUILD_TYPE"),
            pattern: get("PATTERN").unwrap_or_else(|| DEFAULT_PATTERN.to_string()),
            seed,
            port,
            // Negative delays behave like "no delay"
            delay_startup: Duration::from_secs(delay_secs.max(0) as u64),
            wait_for_post_start: get("WAIT_FOR_POST_START").as_deref() == Some("true"),
            ready_file: get("READY_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_READY_FILE)),
            post_start_file: get("POST_START_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_POST_START_FILE)),
            pod_info_dir: get("POD_INFO_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_POD_INFO_DIR)),
        })
    }

    /// Configuration for tests: everything optional unset, markers under `dir`
    #[cfg(test)]
    pub fn for_tests(dir: &std::path::Path) -> Self {
        Config {
            version: "test".to_string(),
            log_file: None,
            log_url: None,
            build_type: None,
            pattern: DEFAULT_PATTERN.to_string(),
            seed: 0,
            port: 0,
            delay_startup: Duration::ZERO,
            wait_for_post_start: false,
            ready_file: dir.join("ready"),
            post_start_file: dir.join("postStart-done"),
            pod_info_dir: dir.join("pod-info"),
        }
    }
}

/// Seeds are signed 64-bit values on the wire; negative ones keep their bit pattern.
fn parse_seed(raw: &str) -> Result<u64, ConfigError> {
    if let Ok(v) = raw.parse::<u64>() {
        return Ok(v);
    }
    raw.parse::<i64>()
        .map(|v| v as u64)
        .map_err(|e| ConfigError::Invalid {
            key: "SEED",
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
