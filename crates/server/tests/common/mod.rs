//! Common test utilities for in-process API tests with mock collaborators.
//!
//! The fixture wires a real orchestrator over `lectern_core::testing` mocks
//! and drives the router with `tower::ServiceExt::oneshot`, so no network
//! or external services are involved.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use lectern_core::testing::{fixtures, MockSet};
use lectern_core::{Config, JobOrchestrator, OrchestratorConfig};
use lectern_server::{create_router, AppState};

/// Test fixture with an in-process router and controllable mocks.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new();
///     let response = fixture.post("/api/v1/jobs", deck_body(2)).await;
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    pub router: Router,
    pub mocks: MockSet,
    pub orchestrator: Arc<JobOrchestrator>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_orchestrator_config(fixtures::orchestrator_config())
    }

    pub fn with_orchestrator_config(orchestrator_config: OrchestratorConfig) -> Self {
        let mocks = MockSet::new();
        let orchestrator = Arc::new(fixtures::orchestrator_with(
            &mocks,
            orchestrator_config.clone(),
        ));

        let config = Config {
            orchestrator: orchestrator_config,
            progress: fixtures::progress_config(),
            processor: fixtures::processor_config(),
            ..Config::default()
        };
        let state = Arc::new(AppState::new(config, Arc::clone(&orchestrator)));

        Self {
            router: create_router(state),
            mocks,
            orchestrator,
        }
    }

    /// Serve the router on an ephemeral local port, for WebSocket tests.
    pub async fn serve(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        addr
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Get the raw response body as text (for /metrics).
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .expect("Failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
        };

        TestResponse { status, body }
    }

    /// Submit a slide deck with `count` units and return the job id.
    pub async fn submit_deck(&self, count: u32) -> String {
        let response = self.post("/api/v1/jobs", deck_body(count)).await;
        assert_eq!(response.status, StatusCode::ACCEPTED, "{:?}", response.body);
        response.body["job_id"]
            .as_str()
            .expect("job_id missing")
            .to_string()
    }

    /// Poll the status endpoint until the job is terminal.
    pub async fn wait_for_terminal(&self, job_id: &str) -> Value {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let response = self.get(&format!("/api/v1/jobs/{}/status", job_id)).await;
            assert_eq!(response.status, StatusCode::OK);
            let status = response.body["status"].as_str().unwrap_or_default().to_string();
            if matches!(status.as_str(), "completed" | "failed" | "cancelled") {
                return response.body;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("job {} did not finish: {:?}", job_id, response.body);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Submission body for a slide deck with `count` distinct slides.
pub fn deck_body(count: u32) -> Value {
    let units: Vec<Value> = (1..=count)
        .map(|n| {
            json!({
                "unit_number": n,
                "title": format!("Slide {}", n),
                "text": format!("Content of slide number {}", n),
            })
        })
        .collect();
    json!({
        "document": {
            "filename": "lecture.pptx",
            "mode": "slide_deck",
            "units": units,
        }
    })
}
