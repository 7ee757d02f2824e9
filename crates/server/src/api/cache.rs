//! Narration cache API handlers.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use lectern_core::CacheStats;

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub removed: u64,
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<CacheStats>, ApiError> {
    let stats = state.orchestrator().processor().cache().stats()?;
    Ok(Json(stats))
}

pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClearCacheResponse>, ApiError> {
    let removed = state.orchestrator().processor().cache().clear()?;
    info!(removed, "Narration cache cleared");
    Ok(Json(ClearCacheResponse { removed }))
}
