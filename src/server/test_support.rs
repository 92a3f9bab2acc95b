//! Shared helpers for server tests

use super::*;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Running router plus the state behind it
pub struct TestServer {
    pub base: String,
    pub state: AppState,
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
    // Keeps marker files alive for the duration of the test
    _dir: tempfile::TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .expect("request should reach the test server")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start the router on an ephemeral port without running the post-ready steps
pub async fn start(configure: impl FnOnce(&mut Config)) -> TestServer {
    start_with_log(configure, None).await
}

pub async fn start_with_log(
    configure: impl FnOnce(&mut Config),
    log: Option<RandomLog>,
) -> TestServer {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = Config::for_tests(dir.path());
    configure(&mut config);

    let (controller, _signal) = shutdown_channel();
    let state = match log {
        Some(log) => AppState::with_log(config, ProcessId::generate(), log, controller),
        None => AppState::new(config, ProcessId::generate(), controller),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = build_router(state.clone());
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestServer {
        base: format!("http://{}", addr),
        state,
        client: reqwest::Client::new(),
        handle,
        _dir: dir,
    }
}
