//! Five-stage processing pipeline
//!
//! This module implements the resumable, idempotent workflow that takes an
//! uploaded lecture video through cut → convert-to-audio → transcribe →
//! summary → evaluate:
//! - `PipelineOrchestrator` sequences the stages and halts on the first
//!   unrecoverable failure
//! - `StageArtifactProbe` detects work completed by earlier runs
//! - `RunLog` + `StageExecutor` keep the stage-execution records
//! - `ProgressProjector` derives the progress view polled by clients

mod executor;
mod ops;
mod orchestrator;
mod probe;
mod progress;
mod run_log;
mod stage;

pub use executor::{sanitize_error, StageExecutor, MAX_ERROR_LEN};
pub use ops::{CommandStageOps, StageOps};
pub use orchestrator::{PipelineOrchestrator, PipelineResult, StageDisposition, StageResult};
pub use probe::StageArtifactProbe;
pub use progress::{
    OverallStatus, PipelineProgress, ProgressProjector, StageProgress, STAGE_COMPLETED,
};
pub use run_log::{MemoryRunLog, RunLog, StageRun};
pub use stage::{Stage, StageReport, StageStatus};
