use serde::{Deserialize, Serialize};
use std::fmt;

/// One named step of the five-step processing pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CutVideo,
    ConvertAudio,
    Transcribe,
    Summary,
    Evaluate,
}

impl Stage {
    /// Fixed execution order. Stages are causally dependent (segments feed
    /// audio conversion, audio feeds transcription, and so on), so this
    /// order is not reorderable at runtime.
    pub const ALL: [Stage; 5] = [
        Stage::CutVideo,
        Stage::ConvertAudio,
        Stage::Transcribe,
        Stage::Summary,
        Stage::Evaluate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CutVideo => "cut_video",
            Stage::ConvertAudio => "convert_audio",
            Stage::Transcribe => "transcribe",
            Stage::Summary => "summary",
            Stage::Evaluate => "evaluate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one stage attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// No attempt recorded yet (never persisted, only projected)
    Pending,
    Running,
    Success,
    Failed,
    /// Prior artifacts made re-execution unnecessary; terminal and
    /// success-equivalent
    Skipped,
}

impl StageStatus {
    /// Skipped counts as done for progress purposes
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, StageStatus::Success | StageStatus::Skipped)
    }
}

/// Structured result returned by an external stage operation.
///
/// A stage may process many units (video segments, audio files, transcript
/// chunks). Only `success_units == 0` with work attempted counts as stage
/// failure; partial failures are reported but do not halt the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageReport {
    pub total_units: usize,
    pub success_units: usize,
    pub failure_units: usize,
    pub failure_messages: Vec<String>,
}

impl StageReport {
    /// A single-unit operation that succeeded
    pub fn single_success() -> Self {
        Self {
            total_units: 1,
            success_units: 1,
            failure_units: 0,
            failure_messages: Vec::new(),
        }
    }

    /// A single-unit operation that failed
    pub fn single_failure(message: impl Into<String>) -> Self {
        Self {
            total_units: 1,
            success_units: 0,
            failure_units: 1,
            failure_messages: vec![message.into()],
        }
    }

    pub fn is_total_failure(&self) -> bool {
        self.success_units == 0 && self.total_units > 0
    }

    pub fn joined_failures(&self) -> String {
        self.failure_messages.join("; ")
    }
}
