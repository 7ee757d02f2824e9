//! HTTP and WebSocket surface for the lectern job engine.

pub mod api;
pub mod metrics;
pub mod state;

pub use api::create_router;
pub use state::AppState;
