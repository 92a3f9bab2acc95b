//! Diagnostic snapshot served by `/info` and logged once at startup
//!
//! Combines memory and CPU figures, the service configuration, and the
//! metadata the orchestrator hands down through environment variables and
//! the downward API volume.

use crate::config::Config;
use crate::random::ProcessId;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::info;

const MIB: u64 = 1024 * 1024;

/// Environment variables injected through the downward API
pub const DOWNWARD_ENV_KEYS: [&str; 2] = ["POD_IP", "NODE_NAME"];

/// Files expected in the downward API volume
pub const DOWNWARD_FILES: [&str; 2] = ["labels", "annotations"];

#[derive(Debug, Error)]
pub enum SysInfoError {
    #[error("failed to read {path}: {source}")]
    Metadata { path: String, source: io::Error },
}

/// Memory figures in MiB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryStats {
    pub max: u64,
    pub used: u64,
    pub free: u64,
}

impl MemoryStats {
    /// Read current figures from the cgroup and procfs
    ///
    /// Max is the cgroup limit when one is set, otherwise total memory.
    /// Used is this process's resident set; free is available memory.
    /// Anything unreadable (e.g. not on Linux) reads as 0.
    pub fn current() -> Self {
        let meminfo = std::fs::read_to_string("/proc/meminfo").unwrap_or_default();
        let status = std::fs::read_to_string("/proc/self/status").unwrap_or_default();
        let cgroup_max = std::fs::read_to_string("/sys/fs/cgroup/memory.max").ok();
        Self::from_sources(&meminfo, &status, cgroup_max.as_deref())
    }

    /// Compute figures from the raw contents of `/proc/meminfo`,
    /// `/proc/self/status` and the cgroup `memory.max` file
    pub fn from_sources(meminfo: &str, status: &str, cgroup_max: Option<&str>) -> Self {
        let total = proc_kib(meminfo, "MemTotal:").unwrap_or(0) * 1024;
        // "max" means unlimited and fails to parse
        let max = cgroup_max
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(total);

        MemoryStats {
            max: max / MIB,
            used: proc_kib(status, "VmRSS:").unwrap_or(0) * 1024 / MIB,
            free: proc_kib(meminfo, "MemAvailable:").unwrap_or(0) * 1024 / MIB,
        }
    }
}

/// Parse a `Key:   1234 kB` line from a procfs file
fn proc_kib(contents: &str, key: &str) -> Option<u64> {
    contents
        .lines()
        .find(|line| line.starts_with(key))
        .and_then(|line| line[key.len()..].split_whitespace().next())
        .and_then(|v| v.parse().ok())
}

pub fn available_processors() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

/// Build the snapshot from explicit inputs
pub fn snapshot(
    config: &Config,
    id: ProcessId,
    memory: MemoryStats,
    processors: usize,
    env: &BTreeMap<String, String>,
) -> Result<Map<String, Value>, SysInfoError> {
    let mut info = Map::new();
    info.insert("memory.max".into(), json!(memory.max));
    info.insert("memory.used".into(), json!(memory.used));
    info.insert("memory.free".into(), json!(memory.free));
    info.insert("cpu.procs".into(), json!(processors));
    info.insert("id".into(), json!(id.to_string()));
    info.insert("version".into(), json!(config.version));
    info.insert("pattern".into(), json!(config.pattern));

    if let Some(file) = &config.log_file {
        info.insert("logFile".into(), json!(file.display().to_string()));
    }
    if let Some(url) = &config.log_url {
        info.insert("logUrl".into(), json!(url));
    }
    if config.seed != 0 {
        info.insert("seed".into(), json!(config.seed as i64));
    }
    if let Some(build_type) = &config.build_type {
        info.insert("build-type".into(), json!(build_type));
    }

    for key in DOWNWARD_ENV_KEYS {
        if let Some(value) = env.get(key) {
            info.insert(key.into(), json!(value));
        }
    }

    for (name, contents) in read_pod_info(&config.pod_info_dir)? {
        info.insert(name.into(), json!(contents));
    }

    info.insert("env".into(), json!(env));
    Ok(info)
}

/// Snapshot of the live process
pub fn collect(config: &Config, id: ProcessId) -> Result<Map<String, Value>, SysInfoError> {
    let env: BTreeMap<String, String> = std::env::vars().collect();
    snapshot(
        config,
        id,
        MemoryStats::current(),
        available_processors(),
        &env,
    )
}

/// Contents of the downward API files that exist under `dir`
fn read_pod_info(dir: &Path) -> Result<Vec<(&'static str, String)>, SysInfoError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for name in DOWNWARD_FILES {
        let path = dir.join(name);
        if !path.exists() {
            continue;
        }
        let contents = std::fs::read(&path).map_err(|source| SysInfoError::Metadata {
            path: path.display().to_string(),
            source,
        })?;
        found.push((name, String::from_utf8_lossy(&contents).into_owned()));
    }
    Ok(found)
}

/// Log the resource figures, as done once the server is up
pub fn dump(memory: MemoryStats, processors: usize) {
    info!("=== Max Memory:       {} MB", memory.max);
    info!("=== Used Memory:      {} MB", memory.used);
    info!("=== Free Memory:      {} MB", memory.free);
    info!("=== Processors:       {}", processors);
}

#[cfg(test)]
#[path = "sysinfo_test.rs"]
mod tests;
