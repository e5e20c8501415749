use super::run_log::RunLog;
use super::stage::{Stage, StageStatus};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Sentinel `current_stage` value once every stage has completed
pub const STAGE_COMPLETED: &str = "completed";

/// Status of a single stage as seen by polling clients
#[derive(Debug, Clone, Serialize)]
pub struct StageProgress {
    pub stage: Stage,
    pub status: StageStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Pending,
    Running,
    Success,
    Failed,
}

/// Snapshot of pipeline progress for one subject
#[derive(Debug, Clone, Serialize)]
pub struct PipelineProgress {
    pub subject_id: String,
    pub total_stages: usize,
    pub completed_stages: usize,
    pub current_stage: String,
    pub status: OverallStatus,
    pub progress: f64,
    pub stages: Vec<StageProgress>,
}

/// Read-only projection over the run log, built for the polling loop that
/// runs concurrently with pipeline execution. Never touches the stage
/// execution path or any process handle.
pub struct ProgressProjector {
    run_log: Arc<dyn RunLog>,
}

impl ProgressProjector {
    pub fn new(run_log: Arc<dyn RunLog>) -> Self {
        Self { run_log }
    }

    pub async fn progress(&self, subject_id: &str) -> Result<PipelineProgress> {
        let all_runs = self.run_log.runs_for_subject(subject_id).await?;

        let stages: Vec<StageProgress> = Stage::ALL
            .iter()
            .map(|&stage| {
                // The most recent attempt is authoritative; earlier runs
                // are audit history
                let latest = all_runs
                    .iter()
                    .filter(|r| r.stage == stage)
                    .max_by_key(|r| r.started_at);

                match latest {
                    Some(run) => StageProgress {
                        stage,
                        status: run.status,
                        started_at: Some(run.started_at),
                        finished_at: run.finished_at,
                        error_message: run.error_message.clone(),
                    },
                    None => StageProgress {
                        stage,
                        status: StageStatus::Pending,
                        started_at: None,
                        finished_at: None,
                        error_message: None,
                    },
                }
            })
            .collect();

        let total_stages = stages.len();
        let completed_stages = stages
            .iter()
            .filter(|s| s.status.is_terminal_success())
            .count();
        let failed = stages.iter().find(|s| s.status == StageStatus::Failed);
        let running = stages.iter().find(|s| s.status == StageStatus::Running);

        let (status, current_stage) = if let Some(view) = failed {
            (OverallStatus::Failed, view.stage.to_string())
        } else if completed_stages == total_stages {
            (OverallStatus::Success, STAGE_COMPLETED.to_string())
        } else if let Some(view) = running {
            (OverallStatus::Running, view.stage.to_string())
        } else if completed_stages == 0 {
            (OverallStatus::Pending, Stage::ALL[0].to_string())
        } else {
            // Between stages: point at the first stage not yet done
            let next = stages
                .iter()
                .find(|s| !s.status.is_terminal_success())
                .map(|s| s.stage.to_string())
                .unwrap_or_else(|| STAGE_COMPLETED.to_string());
            (OverallStatus::Running, next)
        };

        let progress = if total_stages == 0 {
            0.0
        } else {
            completed_stages as f64 / total_stages as f64
        };

        Ok(PipelineProgress {
            subject_id: subject_id.to_string(),
            total_stages,
            completed_stages,
            current_stage,
            status,
            progress,
            stages,
        })
    }
}
