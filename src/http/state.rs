use crate::pipeline::{PipelineOrchestrator, ProgressProjector};
use crate::recording::ProcessSupervisor;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Five-stage pipeline entry point
    pub pipeline: Arc<PipelineOrchestrator>,

    /// Read-only progress view polled by clients
    pub progress: Arc<ProgressProjector>,

    /// Live-capture supervisor
    pub recorder: Arc<ProcessSupervisor>,
}

impl AppState {
    pub fn new(
        pipeline: Arc<PipelineOrchestrator>,
        progress: Arc<ProgressProjector>,
        recorder: Arc<ProcessSupervisor>,
    ) -> Self {
        Self {
            pipeline,
            progress,
            recorder,
        }
    }
}
