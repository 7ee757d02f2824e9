use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{benchmarks, cache, handlers, jobs, middleware::metrics_middleware, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Jobs
        .route("/jobs", post(jobs::submit_job))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{id}/status", get(jobs::get_status))
        .route("/jobs/{id}/result", get(jobs::get_result))
        .route("/jobs/{id}/cancel", post(jobs::cancel_job))
        // Push progress
        .route("/ws/jobs/{id}", get(ws::job_progress_ws))
        // Narration cache
        .route("/cache/stats", get(cache::get_stats))
        .route("/cache", delete(cache::clear_cache))
        // Narration benchmarks
        .route("/benchmarks/history", get(benchmarks::get_history))
        .route("/benchmarks/compare", get(benchmarks::compare));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
