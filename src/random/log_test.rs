//! Tests for the audit log sinks

use super::log::*;
use super::ProcessId;
use axum::{http::StatusCode, routing::post, Json, Router};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Start a collector that records posted bodies and answers with `status`
async fn start_collector(status: StatusCode) -> (String, Arc<Mutex<Vec<serde_json::Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let store = received.clone();
    let app = Router::new().route(
        "/log",
        post(move |Json(body): Json<serde_json::Value>| {
            let store = store.clone();
            async move {
                store.lock().unwrap().push(body);
                status
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{}/log", addr), received)
}

fn assert_line_format(line: &str, id: &ProcessId) {
    let fields: Vec<&str> = line.split(',').collect();
    assert_eq!(fields.len(), 4, "malformed line: {line:?}");

    let time: Vec<&str> = fields[0].split([':', '.']).collect();
    assert_eq!(time.len(), 4, "timestamp should be HH:MM:SS.mmm: {}", fields[0]);
    assert_eq!(time[3].len(), 3);

    assert_eq!(fields[1], id.to_string());
    fields[2].parse::<u128>().expect("duration nanos");
    fields[3].parse::<i32>().expect("value");
}

#[test]
fn test_record_line_format() {
    let id = ProcessId::generate();
    let record = LogRecord::new(id, Duration::from_nanos(1234), -17);

    let line = record.to_line();

    assert!(line.ends_with('\n'));
    assert!(line.trim_end().ends_with(",1234,-17"));
    assert_line_format(line.trim_end(), &id);
}

#[test]
fn test_concurrent_appends_never_interleave() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("random.log");
    let id = ProcessId::generate();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let path = path.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    let record = LogRecord::new(id, Duration::from_nanos(i), worker * 1000 + i as i32);
                    append_line_with_locking(&path, &record.to_line()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 8 * 200);
    for line in lines {
        assert_line_format(line, &id);
    }
}

#[test]
fn test_read_log_file_strips_trailing_newline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("random.log");
    std::fs::write(&path, "a\nb\n").unwrap();

    assert_eq!(read_log_file(&path).unwrap(), "a\nb");
}

#[test]
fn test_read_log_file_missing_is_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(read_log_file(&dir.path().join("nope.log")).is_err());
}

#[tokio::test]
async fn test_file_sink_appends_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("random.log");
    let sink = FileSink::new(&path);
    let id = ProcessId::generate();

    sink.write(&LogRecord::new(id, Duration::from_nanos(5), 1)).await.unwrap();
    sink.write(&LogRecord::new(id, Duration::from_nanos(6), 2)).await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(",5,1"));
    assert!(lines[1].ends_with(",6,2"));
}

#[tokio::test]
async fn test_http_sink_posts_string_fields() {
    let (url, received) = start_collector(StatusCode::OK).await;
    let sink = HttpSink::new(url);
    let id = ProcessId::generate();

    sink.write(&LogRecord::new(id, Duration::from_nanos(99), 7))
        .await
        .expect("delivery should succeed");

    let bodies = received.lock().unwrap().clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["id"], id.to_string());
    assert_eq!(bodies[0]["random"], "7");
    assert_eq!(bodies[0]["duration"], "99");
}

#[tokio::test]
async fn test_http_sink_reports_non_success_status() {
    let (url, _received) = start_collector(StatusCode::INTERNAL_SERVER_ERROR).await;
    let sink = HttpSink::new(url);

    let result = sink
        .write(&LogRecord::new(ProcessId::generate(), Duration::ZERO, 1))
        .await;

    assert!(matches!(result, Err(LogSinkError::Status(500))));
}

#[tokio::test]
async fn test_http_sink_reports_connection_failure() {
    // Bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let sink = HttpSink::new(format!("http://{}/log", addr));
    let result = sink
        .write(&LogRecord::new(ProcessId::generate(), Duration::ZERO, 1))
        .await;

    assert!(matches!(result, Err(LogSinkError::Http(_))));
}

#[tokio::test]
async fn test_random_log_swallows_sink_failures() {
    let failing = MockLogSink::failing();
    let healthy = MockLogSink::new();
    let failing_records = failing.handle();
    let healthy_records = healthy.handle();

    let log = RandomLog::new(vec![Box::new(failing), Box::new(healthy)]);
    log.log_value(&LogRecord::new(ProcessId::generate(), Duration::ZERO, 3))
        .await;

    // Both sinks were attempted despite the first one failing
    assert_eq!(failing_records.lock().unwrap().len(), 1);
    assert_eq!(healthy_records.lock().unwrap().len(), 1);
}

#[test]
fn test_from_config_builds_configured_sinks() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = crate::config::Config::for_tests(dir.path());
    assert!(RandomLog::from_config(&config).is_empty());

    config.log_file = Some(dir.path().join("random.log"));
    assert!(!RandomLog::from_config(&config).is_empty());
}
