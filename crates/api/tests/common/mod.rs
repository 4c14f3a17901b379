use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use scriptd_api::config::ServerConfig;
use scriptd_api::router::build_app_router;
use scriptd_api::state::AppState;
use scriptd_core::scripting::config::ExecutionConfig;
use scriptd_core::scripting::memory_store::MemoryScriptStore;
use scriptd_core::scripting::orchestrator::ExecutionOrchestrator;
use scriptd_core::scripting::registry::ProcessRegistry;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        json_logs: false,
        database_url: None,
    }
}

/// A router over the in-memory store, plus the orchestrator behind it.
///
/// Keep the returned `TempDir` alive for the duration of the test; script
/// files are written there.
pub struct TestApp {
    pub router: Router,
    pub orchestrator: Arc<ExecutionOrchestrator>,
    _script_dir: TempDir,
}

pub fn build_test_app() -> TestApp {
    let script_dir = tempfile::tempdir().expect("temp dir");
    let execution = ExecutionConfig {
        script_dir: script_dir.path().to_path_buf(),
        batch_size: 2,
        start_timeout: Duration::from_secs(5),
        stop_timeout: Duration::from_secs(5),
        ..ExecutionConfig::default()
    };

    let orchestrator = Arc::new(ExecutionOrchestrator::new(
        Arc::new(MemoryScriptStore::new()),
        Arc::new(ProcessRegistry::new()),
        execution,
    ));

    let config = test_config();
    let state = AppState {
        orchestrator: Arc::clone(&orchestrator),
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        orchestrator,
        _script_dir: script_dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_empty(&self, uri: &str) -> Response<Body> {
        self.send(Request::post(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method(Method::DELETE)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Poll `GET /api/v1/scripts/{id}` until the script is no longer running.
    pub async fn wait_until_finished(&self, id: i64) -> serde_json::Value {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let json = body_json(self.get(&format!("/api/v1/scripts/{id}")).await).await;
            if json["data"]["is_running"] == false {
                return json["data"].clone();
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "script {id} still running"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is JSON")
}
