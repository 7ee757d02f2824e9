//! Benchmark history API handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use lectern_core::BenchmarkRecord;

use super::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub records: Vec<BenchmarkRecord>,
    pub limit: usize,
}

/// `job_ids` is a comma-separated list.
#[derive(Debug, Deserialize)]
pub struct CompareParams {
    pub job_ids: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub records: Vec<BenchmarkRecord>,
    /// Requested ids with no record.
    pub missing: Vec<String>,
}

/// Benchmark records of recently completed jobs, newest first.
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Json<HistoryResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    Json(HistoryResponse {
        records: state.orchestrator().benchmark_history(limit),
        limit,
    })
}

/// Side-by-side records for the given jobs, in the order asked for.
pub async fn compare(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CompareParams>,
) -> Result<Json<CompareResponse>, ApiError> {
    let job_ids = parse_job_ids(params.job_ids.as_deref().unwrap_or_default());
    if job_ids.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "job_ids must name at least one job",
        ));
    }

    let records = state.orchestrator().compare_benchmarks(&job_ids);
    let missing = job_ids
        .into_iter()
        .filter(|id| !records.iter().any(|r| &r.job_id == id))
        .collect();
    Ok(Json(CompareResponse { records, missing }))
}

fn parse_job_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}
