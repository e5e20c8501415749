//! Live-capture process supervision
//!
//! This module owns the lifecycle of the external media-capture process:
//! - `ProcessSupervisor` starts a capture with asynchronous readiness
//!   detection and a hard attach timeout, and stops it gracefully with
//!   forced-kill escalation
//! - `RecordingRegistry` tracks active sessions with atomic insert/remove
//! - `CaptureProcess`/`ProcessLauncher` form the process boundary, with an
//!   ffmpeg implementation for production use

mod process;
mod registry;
mod supervisor;

pub use process::{CaptureProcess, FfmpegLauncher, ProcessLauncher};
pub use registry::{RecordingRegistry, RecordingSession};
pub use supervisor::{
    ProcessSupervisor, RecordingArtifact, RecordingError, StartedRecording, SupervisorConfig,
};
