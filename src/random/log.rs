//! Audit log for served random values
//!
//! Two sinks exist: a local file appended under an exclusive advisory lock
//! and a remote collector receiving a JSON POST per value. Delivery is
//! best-effort; a failing sink never fails the request that produced the
//! value.

use crate::config::Config;
use crate::random::ProcessId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde_json::json;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LogSinkError {
    #[error("log file error: {0}")]
    Io(#[from] io::Error),

    #[error("log delivery failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("log collector answered with status {0}")]
    Status(u16),

    #[error("log writer task failed: {0}")]
    Task(String),
}

/// One served value
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub id: ProcessId,
    pub duration: Duration,
    pub value: i32,
}

impl LogRecord {
    pub fn new(id: ProcessId, duration: Duration, value: i32) -> Self {
        Self {
            timestamp: Utc::now(),
            id,
            duration,
            value,
        }
    }

    /// `HH:MM:SS.mmm,<id>,<duration nanos>,<value>\n`, time of day in UTC
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{},{}\n",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.id,
            self.duration.as_nanos(),
            self.value
        )
    }
}

/// Destination for log records
///
/// Production code uses `FileSink` and `HttpSink`.
/// Tests use `MockLogSink` which keeps records in memory.
#[async_trait]
pub trait LogSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn write(&self, record: &LogRecord) -> Result<(), LogSinkError>;
}

/// Append `line` to `path` while holding an exclusive lock on the handle
///
/// The lock is advisory, so it serializes cooperating writers in this and
/// other processes; every line lands whole.
pub fn append_line_with_locking(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.lock_exclusive()?;
    let written = file.write_all(line.as_bytes()).and_then(|_| file.flush());
    let unlocked = FileExt::unlock(&file);
    written?;
    unlocked
}

/// Read the log file back, lines joined by `\n` without a trailing newline
pub fn read_log_file(path: &Path) -> io::Result<String> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents.lines().collect::<Vec<_>>().join("\n"))
}

/// Local file sink
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LogSink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn write(&self, record: &LogRecord) -> Result<(), LogSinkError> {
        let path = self.path.clone();
        let line = record.to_line();
        // flock blocks the calling thread
        tokio::task::spawn_blocking(move || append_line_with_locking(&path, &line))
            .await
            .map_err(|e| LogSinkError::Task(e.to_string()))??;
        Ok(())
    }
}

/// Remote collector sink
pub struct HttpSink {
    url: String,
    client: reqwest::Client,
}

impl HttpSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LogSink for HttpSink {
    fn name(&self) -> &'static str {
        "url"
    }

    async fn write(&self, record: &LogRecord) -> Result<(), LogSinkError> {
        // Collectors expect every field as a string
        let body = json!({
            "id": record.id.to_string(),
            "random": record.value.to_string(),
            "duration": record.duration.as_nanos().to_string(),
        });

        info!(url = %self.url, id = %record.id, "Sending log");
        let response = self.client.post(&self.url).json(&body).send().await?;

        let status = response.status();
        info!(
            status = status.as_u16(),
            id = %record.id,
            "Log delegate response"
        );
        if !status.is_success() {
            return Err(LogSinkError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Fan-out over the configured sinks
pub struct RandomLog {
    sinks: Vec<Box<dyn LogSink>>,
}

impl RandomLog {
    pub fn new(sinks: Vec<Box<dyn LogSink>>) -> Self {
        Self { sinks }
    }

    /// File sink first, then URL sink, each only when configured
    pub fn from_config(config: &Config) -> Self {
        let mut sinks: Vec<Box<dyn LogSink>> = Vec::new();
        if let Some(path) = &config.log_file {
            sinks.push(Box::new(FileSink::new(path.clone())));
        }
        if let Some(url) = &config.log_url {
            sinks.push(Box::new(HttpSink::new(url.clone())));
        }
        Self::new(sinks)
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Deliver `record` to every sink, logging failures instead of returning them
    pub async fn log_value(&self, record: &LogRecord) {
        for sink in &self.sinks {
            if let Err(e) = sink.write(record).await {
                warn!(
                    sink = sink.name(),
                    id = %record.id,
                    error = %e,
                    "Failed to log random value"
                );
            }
        }
    }
}

/// Mock log sink for testing - stores records in memory
#[cfg(test)]
pub struct MockLogSink {
    records: std::sync::Arc<std::sync::Mutex<Vec<LogRecord>>>,
    fail: bool,
}

#[cfg(test)]
impl MockLogSink {
    pub fn new() -> Self {
        Self {
            records: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// A sink that records the attempt and then reports failure
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn handle(&self) -> std::sync::Arc<std::sync::Mutex<Vec<LogRecord>>> {
        self.records.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl LogSink for MockLogSink {
    fn name(&self) -> &'static str {
        "mock"
    }

    #[allow(clippy::unwrap_used)]
    async fn write(&self, record: &LogRecord) -> Result<(), LogSinkError> {
        self.records.lock().unwrap().push(record.clone());
        if self.fail {
            return Err(LogSinkError::Status(500));
        }
        Ok(())
    }
}
