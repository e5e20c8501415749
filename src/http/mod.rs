//! HTTP API server for external control (review UI and polling clients)
//!
//! This module provides a REST API over the pipeline and capture cores:
//! - POST /subjects/:subject_id/pipeline/run - Run the full pipeline
//! - GET /subjects/:subject_id/pipeline/progress - Poll pipeline progress
//! - POST /recordings/start - Start capturing a live stream
//! - POST /recordings/stop/:recording_id - Stop a capture
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
