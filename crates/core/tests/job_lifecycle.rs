//! Job lifecycle integration tests.
//!
//! These drive whole jobs through the orchestrator with mock collaborators:
//! pending -> processing -> completed | failed | cancelled

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tempfile::TempDir;

use lectern_core::{
    collaborators::CollaboratorError,
    job::{Stage, StageState},
    testing::{fixtures, MockSet},
    AssemblyPolicy, Document, JobMode, JobRequest, JobStatus, OrchestratorConfig,
    OrchestratorError, ProgressTransport, SqliteNarrationCache,
};

const TIMEOUT: Duration = Duration::from_secs(10);

fn clips(units: &[u32]) -> Vec<String> {
    units.iter().map(|n| format!("clip://unit-{n}")).collect()
}

#[tokio::test]
async fn test_three_unit_job_completes() {
    let mocks = MockSet::new();
    let orchestrator = fixtures::orchestrator(&mocks);

    let job_id = orchestrator
        .submit(fixtures::slide_deck(3), JobRequest::default())
        .unwrap();
    let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert_eq!(job.total_units, 3);
    assert!(job.completed_at.is_some());
    for unit in &job.units {
        assert_eq!(unit.narration, StageState::Completed);
        assert_eq!(unit.quiz, StageState::Completed);
        assert_eq!(unit.render, StageState::Completed);
        assert!(unit.error.is_none());
    }

    let result = orchestrator.get_result(&job_id).unwrap();
    assert_eq!(result.final_artifact.as_deref(), Some("artifact://final-1.mp4"));
    assert!(result.failed_units.is_empty());
    assert_eq!(result.units.len(), 3);
    assert_eq!(result.units[0].questions.len(), 3);
    assert_eq!(mocks.concatenator.recorded().await, vec![clips(&[1, 2, 3])]);
}

#[tokio::test]
async fn test_out_of_order_completion_assembles_in_unit_order() {
    let mocks = MockSet::new();
    mocks.renderer.set_unit_delay_ms(1, 40).await;
    mocks.renderer.set_unit_delay_ms(2, 80).await;
    let orchestrator = fixtures::orchestrator(&mocks);

    let job_id = orchestrator
        .submit(fixtures::slide_deck(3), JobRequest::default())
        .unwrap();
    let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(mocks.concatenator.recorded().await, vec![clips(&[1, 2, 3])]);
    let units: Vec<u32> = orchestrator
        .get_result(&job_id)
        .unwrap()
        .units
        .iter()
        .map(|u| u.unit_number)
        .collect();
    assert_eq!(units, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_failed_unit_is_skipped_at_assembly() {
    let mocks = MockSet::new();
    mocks
        .narrator
        .fail_unit(2, CollaboratorError::permanent("unreadable slide"))
        .await;
    let orchestrator = fixtures::orchestrator(&mocks);

    let job_id = orchestrator
        .submit(
            fixtures::slide_deck(3),
            JobRequest::default().with_assembly_policy(AssemblyPolicy::SkipFailed),
        )
        .unwrap();
    let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    let unit2 = job.unit(2).unwrap();
    assert_eq!(unit2.narration, StageState::Failed);
    assert!(unit2.error.as_deref().unwrap().contains("unreadable slide"));
    assert_eq!(job.unit(1).unwrap().narration, StageState::Completed);
    assert_eq!(job.unit(3).unwrap().narration, StageState::Completed);

    let result = orchestrator.get_result(&job_id).unwrap();
    assert_eq!(result.failed_units, vec![2]);
    assert!(result.final_artifact.is_some());
    assert_eq!(mocks.concatenator.recorded().await, vec![clips(&[1, 3])]);
}

#[tokio::test]
async fn test_failed_unit_is_fatal_under_fail_fatal_policy() {
    let mocks = MockSet::new();
    mocks
        .narrator
        .fail_unit(2, CollaboratorError::permanent("unreadable slide"))
        .await;
    let orchestrator = fixtures::orchestrator(&mocks);

    let job_id = orchestrator
        .submit(
            fixtures::slide_deck(3),
            JobRequest::default().with_assembly_policy(AssemblyPolicy::FailFatal),
        )
        .unwrap();
    let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.as_deref().unwrap().contains("unit 2"));
    assert!(job.progress < 100);
    assert!(mocks.concatenator.recorded().await.is_empty());
    assert!(matches!(
        orchestrator.get_result(&job_id).unwrap_err(),
        OrchestratorError::InvalidState { .. }
    ));
}

#[tokio::test]
async fn test_cancel_between_dispatches() {
    let mocks = MockSet::new();
    mocks.narrator.block_unit(1).await;
    let config = OrchestratorConfig {
        max_parallel_units: 1,
        ..fixtures::orchestrator_config()
    };
    let orchestrator = fixtures::orchestrator_with(&mocks, config);

    let job_id = orchestrator
        .submit(fixtures::slide_deck(2), JobRequest::default())
        .unwrap();
    assert!(mocks.narrator.wait_for_call(1, TIMEOUT).await);

    let mut events = orchestrator.transport().subscribe(&job_id).await.unwrap();
    let cancelled = orchestrator.cancel(&job_id).unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    mocks.narrator.release_unit(1).await;

    let job = fixtures::wait_for(&orchestrator, &job_id, TIMEOUT, |job| {
        job.unit(1).is_some_and(|u| u.render == StageState::Completed)
    })
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.unit(1).unwrap().narration, StageState::Completed);
    let unit2 = orchestrator.get_status(&job_id).unwrap();
    assert_eq!(unit2.unit(2).unwrap().narration, StageState::Pending);
    assert_eq!(mocks.narrator.calls().await, vec![1]);
    assert!(mocks.concatenator.recorded().await.is_empty());

    // Push stops at the terminal event even though unit 1 kept updating.
    let mut last = None;
    while let Some(event) = events.next().await {
        last = Some(event);
    }
    let last = last.unwrap();
    assert_eq!(last.snapshot.status, JobStatus::Cancelled);
    assert_eq!(last.snapshot.unit(1).unwrap().narration, StageState::Processing);
}

#[tokio::test]
async fn test_cancel_queued_job_never_dispatches() {
    let mocks = MockSet::new();
    mocks.narrator.block_unit(1).await;
    let config = OrchestratorConfig {
        max_parallel_units: 1,
        ..fixtures::orchestrator_config()
    };
    let orchestrator = fixtures::orchestrator_with(&mocks, config);

    // First job holds the only unit slot.
    let first = orchestrator
        .submit(fixtures::slide_deck(1), JobRequest::default())
        .unwrap();
    assert!(mocks.narrator.wait_for_call(1, TIMEOUT).await);
    let second = orchestrator
        .submit(fixtures::slide_deck(2), JobRequest::default())
        .unwrap();
    orchestrator.cancel(&second).unwrap();
    mocks.narrator.release_unit(1).await;

    fixtures::wait_for_terminal(&orchestrator, &first, TIMEOUT).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    let job = orchestrator.get_status(&second).unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert!(job.units.iter().all(|u| u.narration == StageState::Pending));
    assert_eq!(mocks.narrator.call_count().await, 1);
}

#[tokio::test]
async fn test_all_units_failed_fails_job_by_default() {
    let mocks = MockSet::new();
    for unit in [1, 2] {
        mocks
            .narrator
            .fail_unit(unit, CollaboratorError::permanent("empty content"))
            .await;
    }
    let orchestrator = fixtures::orchestrator(&mocks);

    let job_id = orchestrator
        .submit(fixtures::slide_deck(2), JobRequest::default())
        .unwrap();
    let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("all 2 units failed"));
}

#[tokio::test]
async fn test_all_units_failed_can_complete_with_nothing() {
    let mocks = MockSet::new();
    for unit in [1, 2] {
        mocks
            .narrator
            .fail_unit(unit, CollaboratorError::permanent("empty content"))
            .await;
    }
    let config = OrchestratorConfig {
        fail_when_all_units_fail: false,
        ..fixtures::orchestrator_config()
    };
    let orchestrator = fixtures::orchestrator_with(&mocks, config);

    let job_id = orchestrator
        .submit(fixtures::slide_deck(2), JobRequest::default())
        .unwrap();
    let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;

    assert_eq!(job.status, JobStatus::Completed);
    let result = orchestrator.get_result(&job_id).unwrap();
    assert_eq!(result.failed_units, vec![1, 2]);
    assert!(result.final_artifact.is_none());
    assert!(mocks.concatenator.recorded().await.is_empty());
}

#[tokio::test]
async fn test_failed_unit_threshold() {
    let mocks = MockSet::new();
    mocks
        .renderer
        .fail_unit(3, CollaboratorError::permanent("bad layout"))
        .await;
    let config = OrchestratorConfig {
        max_failed_units: Some(0),
        ..fixtures::orchestrator_config()
    };
    let orchestrator = fixtures::orchestrator_with(&mocks, config);

    let job_id = orchestrator
        .submit(fixtures::slide_deck(3), JobRequest::default())
        .unwrap();
    let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.unit(3).unwrap().render, StageState::Failed);
    assert!(job.error.unwrap().contains("1 units failed"));
}

#[tokio::test]
async fn test_failed_unit_threshold_halts_dispatch() {
    let mocks = MockSet::new();
    mocks
        .narrator
        .fail_unit(1, CollaboratorError::permanent("unreadable slide"))
        .await;
    let config = OrchestratorConfig {
        max_parallel_units: 1,
        max_failed_units: Some(0),
        ..fixtures::orchestrator_config()
    };
    let orchestrator = fixtures::orchestrator_with(&mocks, config);

    let job_id = orchestrator
        .submit(fixtures::slide_deck(5), JobRequest::default())
        .unwrap();
    let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("more than the allowed 0"));
    assert_eq!(mocks.narrator.calls().await, vec![1]);
    assert_eq!(mocks.renderer.calls().await, vec![1]);
    let job = orchestrator.get_status(&job_id).unwrap();
    for unit in 2..=5 {
        assert_eq!(job.unit(unit).unwrap().narration, StageState::Pending);
    }
    assert!(mocks.concatenator.recorded().await.is_empty());
}

#[tokio::test]
async fn test_transient_assembly_failure_is_retried() {
    let mocks = MockSet::new();
    mocks
        .concatenator
        .set_next_error(CollaboratorError::transient("encoder busy"))
        .await;
    let orchestrator = fixtures::orchestrator(&mocks);

    let job_id = orchestrator
        .submit(fixtures::slide_deck(2), JobRequest::default())
        .unwrap();
    let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(mocks.concatenator.recorded().await, vec![clips(&[1, 2])]);
    let result = orchestrator.get_result(&job_id).unwrap();
    assert_eq!(result.final_artifact.as_deref(), Some("artifact://final-1.mp4"));
}

#[tokio::test]
async fn test_permanent_assembly_failure_fails_job() {
    let mocks = MockSet::new();
    mocks
        .concatenator
        .set_next_error(CollaboratorError::permanent("unsupported codec"))
        .await;
    let orchestrator = fixtures::orchestrator(&mocks);

    let job_id = orchestrator
        .submit(fixtures::slide_deck(2), JobRequest::default())
        .unwrap();
    let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("unsupported codec"));
    assert!(mocks.concatenator.recorded().await.is_empty());
}

#[tokio::test]
async fn test_transient_failures_are_retried_per_stage() {
    let mocks = MockSet::new();
    mocks
        .narrator
        .fail_transiently(2, 2, CollaboratorError::transient("503"))
        .await;
    let orchestrator = fixtures::orchestrator(&mocks);

    let job_id = orchestrator
        .submit(fixtures::slide_deck(2), JobRequest::default())
        .unwrap();
    let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;

    assert_eq!(job.status, JobStatus::Completed);
    let calls = mocks.narrator.calls().await;
    assert_eq!(calls.iter().filter(|n| **n == 2).count(), 3);
    assert_eq!(calls.iter().filter(|n| **n == 1).count(), 1);
    // Other stages ran once: retries never restart the unit.
    assert_eq!(mocks.renderer.calls().await.len(), 2);
}

#[tokio::test]
async fn test_quiz_failure_keeps_unit_successful() {
    let mocks = MockSet::new();
    mocks
        .quiz
        .fail_unit(1, CollaboratorError::permanent("no questions"))
        .await;
    let orchestrator = fixtures::orchestrator(&mocks);

    let job_id = orchestrator
        .submit(fixtures::slide_deck(2), JobRequest::default())
        .unwrap();
    let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.unit(1).unwrap().quiz, StageState::Failed);
    let result = orchestrator.get_result(&job_id).unwrap();
    assert!(result.failed_units.is_empty());
    assert_eq!(mocks.concatenator.recorded().await, vec![clips(&[1, 2])]);
}

#[tokio::test]
async fn test_narration_only_job() {
    let mocks = MockSet::new();
    let orchestrator = fixtures::orchestrator(&mocks);

    let job_id = orchestrator
        .submit(
            fixtures::slide_deck(2),
            JobRequest::default().with_quiz(false).with_video(false),
        )
        .unwrap();
    let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job
        .units
        .iter()
        .all(|u| u.quiz == StageState::Skipped && u.render == StageState::Skipped));
    assert_eq!(mocks.quiz.call_count().await, 0);
    assert_eq!(mocks.renderer.call_count().await, 0);
    assert!(orchestrator.get_result(&job_id).unwrap().final_artifact.is_none());
}

#[tokio::test]
async fn test_long_form_document_is_chunked() {
    let mocks = MockSet::new();
    let orchestrator = fixtures::orchestrator(&mocks);
    let text = (0..3)
        .map(|p| format!("Paragraph {p} {}", "word ".repeat(150)))
        .collect::<Vec<_>>()
        .join("\n\n");

    let job_id = orchestrator
        .submit(Document::long_form("essay.txt", text), JobRequest::default())
        .unwrap();
    let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.mode, JobMode::LongFormChunked);
    assert_eq!(job.total_units, 3);
}

#[tokio::test]
async fn test_progress_events_are_monotonic() {
    let mocks = MockSet::new();
    mocks.narrator.block_unit(1).await;
    mocks.narrator.set_delay_ms(5).await;
    let orchestrator = fixtures::orchestrator(&mocks);

    let job_id = orchestrator
        .submit(fixtures::slide_deck(4), JobRequest::default())
        .unwrap();
    let mut events = orchestrator.transport().subscribe(&job_id).await.unwrap();
    mocks.narrator.release_unit(1).await;

    let mut seen = Vec::new();
    while let Some(event) = events.next().await {
        seen.push(event);
    }

    assert!(seen.len() > 4);
    for pair in seen.windows(2) {
        assert!(pair[1].snapshot.progress >= pair[0].snapshot.progress);
        assert!(pair[1].updated_at > pair[0].updated_at);
    }
    let last = seen.last().unwrap();
    assert!(last.is_terminal());
    assert_eq!(last.snapshot.status, JobStatus::Completed);
    assert_eq!(last.snapshot.progress, 100);
    assert!(seen[..seen.len() - 1]
        .iter()
        .all(|e| e.snapshot.progress <= 99));
}

#[tokio::test]
async fn test_cache_serves_repeat_jobs() {
    let mocks = MockSet::new();
    let orchestrator = fixtures::orchestrator(&mocks);

    let first = orchestrator
        .submit(fixtures::slide_deck(3), JobRequest::default())
        .unwrap();
    fixtures::wait_for_terminal(&orchestrator, &first, TIMEOUT).await;
    let second = orchestrator
        .submit(fixtures::slide_deck(3), JobRequest::default())
        .unwrap();
    fixtures::wait_for_terminal(&orchestrator, &second, TIMEOUT).await;

    assert_eq!(mocks.narrator.call_count().await, 3);
    let result = orchestrator.get_result(&second).unwrap();
    assert_eq!(result.cache_hits, 3);
    assert_eq!(result.cache_misses, 0);
    assert!(result.units.iter().all(|u| u.narration_cached));

    // A different language is a different key.
    let third = orchestrator
        .submit(fixtures::slide_deck(3), JobRequest::default().with_language("it"))
        .unwrap();
    fixtures::wait_for_terminal(&orchestrator, &third, TIMEOUT).await;
    assert_eq!(mocks.narrator.call_count().await, 6);
}

#[tokio::test]
async fn test_concurrent_jobs_share_narration_calls() {
    let mocks = MockSet::new();
    mocks.narrator.set_delay_ms(30).await;
    let orchestrator = fixtures::orchestrator(&mocks);

    let a = orchestrator
        .submit(fixtures::slide_deck(2), JobRequest::default())
        .unwrap();
    let b = orchestrator
        .submit(fixtures::slide_deck(2), JobRequest::default())
        .unwrap();
    fixtures::wait_for_terminal(&orchestrator, &a, TIMEOUT).await;
    fixtures::wait_for_terminal(&orchestrator, &b, TIMEOUT).await;

    let mut calls = mocks.narrator.calls().await;
    calls.sort_unstable();
    assert_eq!(calls, vec![1, 2]);
}

#[tokio::test]
async fn test_sqlite_cache_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cache.db");

    for run in 0..2 {
        let mocks = MockSet::new();
        let cache = Arc::new(SqliteNarrationCache::new(&path).unwrap());
        let orchestrator =
            fixtures::orchestrator_with_cache(&mocks, fixtures::orchestrator_config(), cache);

        let job_id = orchestrator
            .submit(fixtures::slide_deck(2), JobRequest::default())
            .unwrap();
        let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;
        assert_eq!(job.status, JobStatus::Completed);

        let expected_calls = if run == 0 { 2 } else { 0 };
        assert_eq!(mocks.narrator.call_count().await, expected_calls);
    }
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let mocks = MockSet::new();
    let orchestrator = fixtures::orchestrator(&mocks);

    let first = orchestrator
        .submit(fixtures::slide_deck(1), JobRequest::default())
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = orchestrator
        .submit(fixtures::slide_deck(1), JobRequest::default())
        .unwrap();

    let listed: Vec<String> = orchestrator.list(10).into_iter().map(|s| s.job_id).collect();
    assert_eq!(listed, vec![second, first]);
    assert_eq!(orchestrator.list(1).len(), 1);
}

#[tokio::test]
async fn test_unit_sub_states_show_mid_unit_progress() {
    let mocks = MockSet::new();
    mocks.renderer.block_unit(1).await;
    let orchestrator = fixtures::orchestrator(&mocks);

    let job_id = orchestrator
        .submit(fixtures::slide_deck(1), JobRequest::default())
        .unwrap();
    assert!(mocks.renderer.wait_for_call(1, TIMEOUT).await);

    let job = orchestrator.get_status(&job_id).unwrap();
    let unit = job.unit(1).unwrap();
    assert_eq!(unit.stage(Stage::Narration), StageState::Completed);
    assert_eq!(unit.stage(Stage::Quiz), StageState::Completed);
    assert_eq!(unit.stage(Stage::Render), StageState::Processing);
    assert_eq!(job.current_step, "Rendering unit");
    assert_eq!(job.current_unit, Some(1));
    assert_eq!(job.progress, 66);

    mocks.renderer.release_unit(1).await;
    fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;
}

#[tokio::test]
async fn test_completed_jobs_leave_benchmark_records() {
    let mocks = MockSet::new();
    mocks
        .narrator
        .fail_unit(2, CollaboratorError::permanent("unreadable slide"))
        .await;
    let orchestrator = fixtures::orchestrator(&mocks);

    let first = orchestrator
        .submit(fixtures::slide_deck(3), JobRequest::default())
        .unwrap();
    fixtures::wait_for_terminal(&orchestrator, &first, TIMEOUT).await;
    let second = orchestrator
        .submit(fixtures::slide_deck(1), JobRequest::default())
        .unwrap();
    fixtures::wait_for_terminal(&orchestrator, &second, TIMEOUT).await;

    let history = orchestrator.benchmark_history(10);
    let ids: Vec<&str> = history.iter().map(|r| r.job_id.as_str()).collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);

    let record = &history[1];
    assert_eq!(record.model_version, "narrator-v1");
    assert_eq!(record.summary.units_count, 3);
    assert_eq!(record.summary.failed_units, 1);
    assert!(record.summary.avg_word_count.is_some());
    assert_eq!(record.units[1].word_count, None);
    assert!(record.units[0].word_count.is_some());

    let compared = orchestrator.compare_benchmarks(&[first.clone(), "job-unknown".to_string()]);
    assert_eq!(compared.len(), 1);
    assert_eq!(compared[0].job_id, first);
}

#[tokio::test]
async fn test_failed_job_leaves_no_benchmark_record() {
    let mocks = MockSet::new();
    mocks
        .narrator
        .fail_unit(1, CollaboratorError::permanent("empty content"))
        .await;
    let orchestrator = fixtures::orchestrator(&mocks);

    let job_id = orchestrator
        .submit(fixtures::slide_deck(1), JobRequest::default())
        .unwrap();
    let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(orchestrator.benchmark_history(10).is_empty());
}

#[tokio::test]
async fn test_panicking_unit_fails_only_that_unit() {
    let mocks = MockSet::new();
    mocks.renderer.panic_unit(2).await;
    let orchestrator = fixtures::orchestrator(&mocks);

    let job_id = orchestrator
        .submit(fixtures::slide_deck(3), JobRequest::default())
        .unwrap();
    let job = fixtures::wait_for_terminal(&orchestrator, &job_id, TIMEOUT).await;

    assert_eq!(job.status, JobStatus::Completed);
    let unit2 = job.unit(2).unwrap();
    assert_eq!(unit2.narration, StageState::Completed);
    assert_eq!(unit2.render, StageState::Failed);
    assert!(unit2.error.as_deref().unwrap().contains("render aborted"));

    let result = orchestrator.get_result(&job_id).unwrap();
    assert_eq!(result.failed_units, vec![2]);
    assert_eq!(mocks.concatenator.recorded().await, vec![clips(&[1, 3])]);
}
