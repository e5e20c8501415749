pub mod config;
pub mod http;
pub mod pipeline;
pub mod recording;

pub use config::Config;
pub use http::{create_router, AppState};
pub use pipeline::{
    CommandStageOps, MemoryRunLog, OverallStatus, PipelineOrchestrator, PipelineProgress,
    PipelineResult, ProgressProjector, RunLog, Stage, StageArtifactProbe, StageOps, StageReport,
    StageRun, StageStatus,
};
pub use recording::{
    CaptureProcess, FfmpegLauncher, ProcessLauncher, ProcessSupervisor, RecordingArtifact,
    RecordingError, RecordingRegistry, StartedRecording, SupervisorConfig,
};
