//! Job control API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use lectern_core::{Document, Job, JobRequest, JobResult, JobStatus, JobSummary};

use super::ApiError;
use crate::state::AppState;

/// Maximum allowed limit for job listings
const MAX_LIMIT: usize = 1000;

/// Default limit for job listings
const DEFAULT_LIMIT: usize = 50;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a job
#[derive(Debug, Deserialize)]
pub struct SubmitJobBody {
    /// Pre-extracted document content
    pub document: Document,
    #[serde(default)]
    pub options: JobRequest,
}

#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
    pub status: JobStatus,
}

/// Query parameters for listing jobs
#[derive(Debug, Deserialize)]
pub struct ListJobsParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobSummary>,
    pub limit: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a document for processing. Responds 202 with the new job id.
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitJobBody>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiError> {
    let filename = body.document.filename.clone();
    let job_id = state.orchestrator().submit(body.document, body.options)?;
    info!(job_id = %job_id, filename = %filename, "Job accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse {
            job_id,
            status: JobStatus::Pending,
        }),
    ))
}

/// List recent jobs, newest first.
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListJobsParams>,
) -> Json<ListJobsResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    Json(ListJobsResponse {
        jobs: state.orchestrator().list(limit),
        limit,
    })
}

/// Poll snapshot of one job.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.orchestrator().get_status(&id)?))
}

/// Outputs of a completed job. 409 while the job is in any other status.
pub async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResult>, ApiError> {
    Ok(Json(state.orchestrator().get_result(&id)?))
}

pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.orchestrator().cancel(&id)?))
}
