//! Job control surface driven through the router with mock collaborators.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use common::{deck_body, TestFixture};
use lectern_core::testing::fixtures;
use lectern_core::{CollaboratorError, OrchestratorConfig};

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["active_jobs"], 0);
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/config").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["collaborators"]["narration_configured"], false);
    assert!(response.body["collaborators"].get("narration_url").is_none());
    assert_eq!(response.body["orchestrator"]["max_parallel_units"], 4);
}

#[tokio::test]
async fn test_submit_runs_job_to_completion() {
    let fixture = TestFixture::new();

    let response = fixture.post("/api/v1/jobs", deck_body(3)).await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(response.body["status"], "pending");
    let job_id = response.body["job_id"].as_str().unwrap().to_string();

    let job = fixture.wait_for_terminal(&job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["progress"], 100);
    assert_eq!(job["total_slides"], 3);
    assert_eq!(job["slides_progress"].as_array().unwrap().len(), 3);

    let result = fixture.get(&format!("/api/v1/jobs/{}/result", job_id)).await;
    assert_eq!(result.status, StatusCode::OK);
    assert_eq!(result.body["job_id"], job_id.as_str());
    assert_eq!(result.body["units"].as_array().unwrap().len(), 3);
    assert!(result.body["final_artifact"]
        .as_str()
        .unwrap()
        .starts_with("artifact://"));
    assert_eq!(result.body["failed_units"], json!([]));
}

#[tokio::test]
async fn test_submit_with_options() {
    let fixture = TestFixture::new();
    let mut body = deck_body(2);
    body["options"] = json!({ "language": "es", "generate_quiz": false, "generate_video": false });

    let response = fixture.post("/api/v1/jobs", body).await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    let job_id = response.body["job_id"].as_str().unwrap().to_string();

    let job = fixture.wait_for_terminal(&job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["language"], "es");
    assert!(fixture.mocks.quiz.calls().await.is_empty());
    assert!(fixture.mocks.renderer.calls().await.is_empty());

    let result = fixture.get(&format!("/api/v1/jobs/{}/result", job_id)).await;
    assert!(result.body.get("final_artifact").is_none());
}

#[tokio::test]
async fn test_unsupported_language_is_bad_request() {
    let fixture = TestFixture::new();
    let mut body = deck_body(1);
    body["options"] = json!({ "language": "tlh" });

    let response = fixture.post("/api/v1/jobs", body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("unsupported language"));
    assert!(fixture.orchestrator.list(10).is_empty());
}

#[tokio::test]
async fn test_document_without_text_is_bad_request() {
    let fixture = TestFixture::new();
    let body = json!({
        "document": {
            "filename": "blank.pdf",
            "mode": "paginated_document",
            "units": [{ "unit_number": 1, "text": "   " }],
        }
    });

    let response = fixture.post("/api/v1/jobs", body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_malformed_body_is_client_error() {
    let fixture = TestFixture::new();

    let response = fixture
        .post("/api/v1/jobs", json!({ "document": { "filename": 3 } }))
        .await;

    assert!(response.status.is_client_error());
}

#[tokio::test]
async fn test_long_form_text_is_chunked() {
    let fixture = TestFixture::new();
    let paragraph = "Ownership moves values between bindings. ".repeat(30);
    let text = format!("{}\n\n{}\n\n{}", paragraph, paragraph, paragraph);
    let body = json!({
        "document": { "filename": "essay.txt", "mode": "long_form_chunked", "text": text },
        "options": { "generate_video": false }
    });

    let response = fixture.post("/api/v1/jobs", body).await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    let job_id = response.body["job_id"].as_str().unwrap().to_string();

    let job = fixture.wait_for_terminal(&job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["mode"], "long_form_chunked");
    assert!(job["total_slides"].as_u64().unwrap() >= 2);
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let fixture = TestFixture::new();

    for path in [
        "/api/v1/jobs/missing/status",
        "/api/v1/jobs/missing/result",
    ] {
        let response = fixture.get(path).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{}", path);
        assert!(response.body["error"].as_str().unwrap().contains("missing"));
    }

    let response = fixture.post_empty("/api/v1/jobs/missing/cancel").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_result_and_cancel_conflicts() {
    let fixture = TestFixture::new();
    fixture.mocks.narrator.block_unit(1).await;

    let job_id = fixture.submit_deck(2).await;
    assert!(
        fixture
            .mocks
            .narrator
            .wait_for_call(1, Duration::from_secs(2))
            .await
    );

    let result = fixture.get(&format!("/api/v1/jobs/{}/result", job_id)).await;
    assert_eq!(result.status, StatusCode::CONFLICT);

    let cancelled = fixture
        .post_empty(&format!("/api/v1/jobs/{}/cancel", job_id))
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.body["status"], "cancelled");

    let again = fixture
        .post_empty(&format!("/api/v1/jobs/{}/cancel", job_id))
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    fixture.mocks.narrator.release_unit(1).await;
    let job = fixture.wait_for_terminal(&job_id).await;
    assert_eq!(job["status"], "cancelled");
}

#[tokio::test]
async fn test_admission_limit_is_too_many_requests() {
    let fixture = TestFixture::with_orchestrator_config(OrchestratorConfig {
        max_concurrent_jobs: 1,
        ..fixtures::orchestrator_config()
    });
    fixture.mocks.narrator.block_unit(1).await;

    let first = fixture.submit_deck(1).await;
    let second = fixture.post("/api/v1/jobs", deck_body(1)).await;

    assert_eq!(second.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(second.body["error"].is_string());

    fixture.mocks.narrator.release_unit(1).await;
    fixture.wait_for_terminal(&first).await;

    let third = fixture.post("/api/v1/jobs", deck_body(1)).await;
    assert_eq!(third.status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_failed_unit_is_reported_in_result() {
    let fixture = TestFixture::new();
    fixture
        .mocks
        .narrator
        .fail_unit(2, CollaboratorError::permanent("unreadable slide"))
        .await;

    let job_id = fixture.submit_deck(3).await;
    let job = fixture.wait_for_terminal(&job_id).await;
    assert_eq!(job["status"], "completed");

    let result = fixture.get(&format!("/api/v1/jobs/{}/result", job_id)).await;
    assert_eq!(result.status, StatusCode::OK);
    assert_eq!(result.body["failed_units"], json!([2]));
}

#[tokio::test]
async fn test_list_newest_first_with_limit() {
    let fixture = TestFixture::new();
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(fixture.submit_deck(1).await);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let response = fixture.get("/api/v1/jobs?limit=2").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["limit"], 2);
    let jobs = response.body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["job_id"], ids[2].as_str());
    assert_eq!(jobs[1]["job_id"], ids[1].as_str());
}

#[tokio::test]
async fn test_cache_stats_and_clear() {
    let fixture = TestFixture::new();
    let job_id = fixture.submit_deck(2).await;
    fixture.wait_for_terminal(&job_id).await;

    let stats = fixture.get("/api/v1/cache/stats").await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["entries"], 2);

    let cleared = fixture.delete("/api/v1/cache").await;
    assert_eq!(cleared.status, StatusCode::OK);
    assert_eq!(cleared.body["removed"], 2);

    let stats = fixture.get("/api/v1/cache/stats").await;
    assert_eq!(stats.body["entries"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new();
    let job_id = fixture.submit_deck(1).await;
    fixture.wait_for_terminal(&job_id).await;

    let (status, body) = fixture.get_text("/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("lectern_jobs_by_status"));
    assert!(body.contains("lectern_jobs_submitted_total"));
    assert!(body.contains("lectern_http_requests_total"));
}

#[tokio::test]
async fn test_benchmark_history_and_compare() {
    let fixture = TestFixture::new();
    let first = fixture.submit_deck(2).await;
    fixture.wait_for_terminal(&first).await;
    let second = fixture.submit_deck(1).await;
    fixture.wait_for_terminal(&second).await;

    let history = fixture.get("/api/v1/benchmarks/history?limit=1").await;
    assert_eq!(history.status, StatusCode::OK);
    assert_eq!(history.body["limit"], 1);
    let records = history.body["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["job_id"], second.as_str());
    assert_eq!(records[0]["model_version"], "narrator-v1");
    assert!(records[0]["summary"]["avg_word_count"].is_number());

    let path = format!("/api/v1/benchmarks/compare?job_ids={first},job-unknown,{second}");
    let compared = fixture.get(&path).await;
    assert_eq!(compared.status, StatusCode::OK);
    let ids: Vec<&str> = compared.body["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["job_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![first.as_str(), second.as_str()]);
    assert_eq!(compared.body["missing"], json!(["job-unknown"]));
    assert_eq!(compared.body["records"][0]["summary"]["units_count"], 2);
}

#[tokio::test]
async fn test_benchmark_compare_requires_job_ids() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/benchmarks/compare?job_ids=,").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].is_string());
}
