use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Recording control
        .route("/recordings/start", post(handlers::start_recording))
        .route(
            "/recordings/stop/:recording_id",
            post(handlers::stop_recording),
        )
        // Pipeline control and polling
        .route(
            "/subjects/:subject_id/pipeline/run",
            post(handlers::run_pipeline),
        )
        .route(
            "/subjects/:subject_id/pipeline/progress",
            get(handlers::pipeline_progress),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
