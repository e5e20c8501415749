use super::state::AppState;
use crate::recording::RecordingError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartRecordingRequest {
    /// Stream URL to capture (e.g. an RTMP/RTSP classroom feed)
    pub stream_url: String,

    /// Target lesson for the finished recording
    pub lesson_id: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /subjects/:subject_id/pipeline/run
/// Run the full five-stage pipeline for a subject; completes when the
/// pipeline does, while clients poll the progress endpoint
pub async fn run_pipeline(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> impl IntoResponse {
    info!("Pipeline run requested for subject: {}", subject_id);

    match state.pipeline.run_full_pipeline(&subject_id).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            error!("Pipeline bookkeeping failed for {}: {}", subject_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Pipeline bookkeeping failed: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /subjects/:subject_id/pipeline/progress
/// Progress snapshot for the polling progress bar
pub async fn pipeline_progress(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> impl IntoResponse {
    match state.progress.progress(&subject_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => {
            error!("Progress query failed for {}: {}", subject_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Progress query failed: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /recordings/start
/// Start capturing a live stream
pub async fn start_recording(
    State(state): State<AppState>,
    Json(req): Json<StartRecordingRequest>,
) -> impl IntoResponse {
    match state.recorder.start(&req.stream_url, req.lesson_id).await {
        Ok(started) => {
            info!("Recording started: {}", started.recording_id);
            (StatusCode::OK, Json(started)).into_response()
        }
        Err(e) => recording_error_response(e),
    }
}

/// POST /recordings/stop/:recording_id
/// Stop a capture and return the finished artifact metadata
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(recording_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.recorder.stop(recording_id).await {
        Ok(artifact) => (StatusCode::OK, Json(artifact)).into_response(),
        Err(e) => recording_error_response(e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

fn recording_error_response(err: RecordingError) -> Response {
    let status = match &err {
        RecordingError::EmptyStreamUrl => StatusCode::BAD_REQUEST,
        RecordingError::NotFound(_) => StatusCode::NOT_FOUND,
        RecordingError::ConnectFailed { .. } | RecordingError::ConnectTimeout(_) => {
            StatusCode::BAD_GATEWAY
        }
        RecordingError::OutputMissing(_)
        | RecordingError::OutputEmpty(_)
        | RecordingError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    error!("Recording request failed: {}", err);

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}
