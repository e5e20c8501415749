use super::executor::StageExecutor;
use super::ops::StageOps;
use super::probe::StageArtifactProbe;
use super::run_log::RunLog;
use super::stage::{Stage, StageReport};
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// How a stage ended up in a pipeline result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageDisposition {
    /// Freshly executed and succeeded (possibly with partial unit failures)
    Completed,
    /// Prior artifacts found; the external operation was not invoked
    Skipped,
    /// Fully failed, or raised an unexpected fault
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub stage: Stage,
    pub disposition: StageDisposition,
    /// The operation's report, present when the stage actually ran
    pub report: Option<StageReport>,
    pub error: Option<String>,
}

/// Aggregated outcome of one `run_full_pipeline` call: one entry per
/// attempted stage in order, so callers can tell freshly-computed stages
/// from already-done ones. A failed entry is always the last one.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub subject_id: String,
    pub run_id: Uuid,
    pub stages: Vec<StageResult>,
}

impl PipelineResult {
    pub fn first_failure(&self) -> Option<&StageResult> {
        self.stages
            .iter()
            .find(|s| s.disposition == StageDisposition::Failed)
    }

    /// All five stages reached a success-equivalent end
    pub fn is_complete(&self) -> bool {
        self.stages.len() == Stage::ALL.len() && self.first_failure().is_none()
    }
}

/// Sequences the five stages for one subject: probe for prior artifacts,
/// skip what is already done, execute the rest with run-log bookkeeping,
/// and halt at the first unrecoverable stage failure.
pub struct PipelineOrchestrator {
    executor: StageExecutor,
    probe: StageArtifactProbe,
    ops: Arc<dyn StageOps>,
}

impl PipelineOrchestrator {
    pub fn new(
        run_log: Arc<dyn RunLog>,
        probe: StageArtifactProbe,
        ops: Arc<dyn StageOps>,
    ) -> Self {
        Self {
            executor: StageExecutor::new(run_log),
            probe,
            ops,
        }
    }

    /// Drive all five stages in fixed order.
    ///
    /// Stage-operation failures and faults are captured in the result and
    /// never propagate; only run-log write failures surface as `Err`.
    pub async fn run_full_pipeline(&self, subject_id: &str) -> Result<PipelineResult> {
        let run_id = Uuid::new_v4();
        let mut result = PipelineResult {
            subject_id: subject_id.to_string(),
            run_id,
            stages: Vec::with_capacity(Stage::ALL.len()),
        };

        info!("Starting pipeline run {} for subject {}", run_id, subject_id);

        for stage in Stage::ALL {
            if self.probe.stage_completed(subject_id, stage) {
                info!(
                    "Stage {} already has artifacts for subject {}, skipping",
                    stage, subject_id
                );
                let reason = format!(
                    "Skipped: the {} stage already completed in an earlier run and was not re-executed.",
                    stage
                );
                self.executor
                    .mark_skipped(subject_id, run_id, stage, &reason)
                    .await?;
                result.stages.push(StageResult {
                    stage,
                    disposition: StageDisposition::Skipped,
                    report: None,
                    error: None,
                });
                continue;
            }

            let mut run = self.executor.start(subject_id, run_id, stage).await?;

            match self.ops.execute(stage, subject_id).await {
                Ok(report) if report.is_total_failure() => {
                    let message = format!(
                        "All {} units failed in stage {}: {}",
                        report.total_units,
                        stage,
                        report.joined_failures()
                    );
                    error!("Pipeline run {} halted: {}", run_id, message);
                    self.executor.mark_failed(&mut run, &message).await?;
                    result.stages.push(StageResult {
                        stage,
                        disposition: StageDisposition::Failed,
                        report: Some(report),
                        error: Some(message),
                    });
                    return Ok(result);
                }
                Ok(report) => {
                    if report.failure_units > 0 {
                        warn!(
                            "Stage {} finished with {}/{} failed units for subject {}",
                            stage, report.failure_units, report.total_units, subject_id
                        );
                    }
                    self.executor.mark_success(&mut run).await?;
                    result.stages.push(StageResult {
                        stage,
                        disposition: StageDisposition::Completed,
                        report: Some(report),
                        error: None,
                    });
                }
                Err(fault) => {
                    let message = format!("Stage {} raised an unexpected fault: {}", stage, fault);
                    error!("Pipeline run {} halted: {}", run_id, message);
                    self.executor.mark_failed(&mut run, &message).await?;
                    result.stages.push(StageResult {
                        stage,
                        disposition: StageDisposition::Failed,
                        report: None,
                        error: Some(message),
                    });
                    return Ok(result);
                }
            }
        }

        info!("Pipeline run {} completed for subject {}", run_id, subject_id);
        Ok(result)
    }
}
