// Integration tests for the five-stage pipeline orchestrator
//
// These verify skip-by-artifact detection, halt-on-first-failure, and the
// stage bookkeeping records written to the run log.

use anyhow::Result;
use async_trait::async_trait;
use classroom_pipeline::pipeline::{
    MemoryRunLog, PipelineOrchestrator, RunLog, Stage, StageArtifactProbe, StageDisposition,
    StageOps, StageReport, StageStatus,
};
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Clone, Copy)]
enum Outcome {
    Success,
    PartialFailure,
    TotalFailure,
    Fault,
}

/// Scripted stage operations with per-stage call counting
struct ScriptedOps {
    calls: Mutex<HashMap<Stage, usize>>,
    outcomes: HashMap<Stage, Outcome>,
}

impl ScriptedOps {
    fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
            outcomes: HashMap::new(),
        }
    }

    fn with(mut self, stage: Stage, outcome: Outcome) -> Self {
        self.outcomes.insert(stage, outcome);
        self
    }

    fn calls(&self, stage: Stage) -> usize {
        *self.calls.lock().unwrap().get(&stage).unwrap_or(&0)
    }
}

#[async_trait]
impl StageOps for ScriptedOps {
    async fn execute(&self, stage: Stage, _subject_id: &str) -> Result<StageReport> {
        *self.calls.lock().unwrap().entry(stage).or_insert(0) += 1;

        match self.outcomes.get(&stage).copied().unwrap_or(Outcome::Success) {
            Outcome::Success => Ok(StageReport {
                total_units: 3,
                success_units: 3,
                failure_units: 0,
                failure_messages: vec![],
            }),
            Outcome::PartialFailure => Ok(StageReport {
                total_units: 3,
                success_units: 2,
                failure_units: 1,
                failure_messages: vec!["segment 2 failed".to_string()],
            }),
            Outcome::TotalFailure => Ok(StageReport {
                total_units: 3,
                success_units: 0,
                failure_units: 3,
                failure_messages: vec!["all segments failed".to_string()],
            }),
            Outcome::Fault => Err(anyhow::anyhow!("transcoder exploded")),
        }
    }
}

fn orchestrator(
    root: &TempDir,
    ops: Arc<ScriptedOps>,
    run_log: Arc<MemoryRunLog>,
) -> PipelineOrchestrator {
    PipelineOrchestrator::new(run_log, StageArtifactProbe::new(root.path()), ops)
}

#[tokio::test]
async fn fresh_subject_runs_all_five_stages_in_order() -> Result<()> {
    let root = TempDir::new()?;
    let ops = Arc::new(ScriptedOps::new());
    let run_log = Arc::new(MemoryRunLog::new());
    let pipeline = orchestrator(&root, ops.clone(), run_log.clone());

    let result = pipeline.run_full_pipeline("lecture-1").await?;

    assert!(result.is_complete());
    assert_eq!(result.stages.len(), 5);
    assert!(result
        .stages
        .iter()
        .all(|s| s.disposition == StageDisposition::Completed));

    let runs = run_log.runs_for_subject("lecture-1").await?;
    assert_eq!(runs.len(), 5);

    let stage_order: Vec<Stage> = runs.iter().map(|r| r.stage).collect();
    assert_eq!(stage_order, Stage::ALL.to_vec());
    assert!(runs.iter().all(|r| r.status == StageStatus::Success));
    assert!(runs.iter().all(|r| r.finished_at.is_some()));
    // All five attempts share one run id
    assert!(runs.iter().all(|r| r.run_id == runs[0].run_id));

    for stage in Stage::ALL {
        assert_eq!(ops.calls(stage), 1, "stage {} should run exactly once", stage);
    }

    Ok(())
}

#[tokio::test]
async fn existing_artifact_skips_stage_without_invoking_operation() -> Result<()> {
    let root = TempDir::new()?;

    // Pre-populate transcripts from an earlier run
    let transcript_dir = root.path().join("lecture-2").join("transcripts");
    fs::create_dir_all(&transcript_dir)?;
    fs::write(transcript_dir.join("segment-000.txt"), "hello")?;

    let ops = Arc::new(ScriptedOps::new());
    let run_log = Arc::new(MemoryRunLog::new());
    let pipeline = orchestrator(&root, ops.clone(), run_log.clone());

    let result = pipeline.run_full_pipeline("lecture-2").await?;

    assert!(result.is_complete());
    assert_eq!(result.stages[2].disposition, StageDisposition::Skipped);
    assert_eq!(ops.calls(Stage::Transcribe), 0);
    assert_eq!(ops.calls(Stage::CutVideo), 1);
    assert_eq!(ops.calls(Stage::Evaluate), 1);

    // Skip still writes a full record with a human-readable reason
    let runs = run_log.runs_for_subject("lecture-2").await?;
    assert_eq!(runs.len(), 5);
    let transcribe_run = runs.iter().find(|r| r.stage == Stage::Transcribe).unwrap();
    assert_eq!(transcribe_run.status, StageStatus::Skipped);
    assert!(transcribe_run.finished_at.is_some());
    assert!(transcribe_run
        .error_message
        .as_deref()
        .unwrap_or_default()
        .contains("already completed"));

    Ok(())
}

#[tokio::test]
async fn total_failure_halts_pipeline_and_writes_no_later_records() -> Result<()> {
    let root = TempDir::new()?;
    let ops = Arc::new(ScriptedOps::new().with(Stage::Transcribe, Outcome::TotalFailure));
    let run_log = Arc::new(MemoryRunLog::new());
    let pipeline = orchestrator(&root, ops.clone(), run_log.clone());

    let result = pipeline.run_full_pipeline("lecture-3").await?;

    assert!(!result.is_complete());
    assert_eq!(result.stages.len(), 3);
    let failed = result.first_failure().unwrap();
    assert_eq!(failed.stage, Stage::Transcribe);
    assert!(failed.error.as_deref().unwrap().contains("all segments failed"));

    let runs = run_log.runs_for_subject("lecture-3").await?;
    assert_eq!(runs.len(), 3);
    assert!(runs.iter().all(|r| r.stage != Stage::Summary && r.stage != Stage::Evaluate));

    let failed_run = runs.iter().find(|r| r.stage == Stage::Transcribe).unwrap();
    assert_eq!(failed_run.status, StageStatus::Failed);
    assert!(failed_run
        .error_message
        .as_deref()
        .unwrap()
        .contains("all segments failed"));

    assert_eq!(ops.calls(Stage::Summary), 0);
    assert_eq!(ops.calls(Stage::Evaluate), 0);

    Ok(())
}

#[tokio::test]
async fn partial_failure_continues_to_later_stages() -> Result<()> {
    let root = TempDir::new()?;
    let ops = Arc::new(ScriptedOps::new().with(Stage::ConvertAudio, Outcome::PartialFailure));
    let run_log = Arc::new(MemoryRunLog::new());
    let pipeline = orchestrator(&root, ops.clone(), run_log.clone());

    let result = pipeline.run_full_pipeline("lecture-4").await?;

    assert!(result.is_complete());
    assert_eq!(result.stages.len(), 5);

    // The partial failure is reported but does not halt anything
    let convert = &result.stages[1];
    assert_eq!(convert.disposition, StageDisposition::Completed);
    let report = convert.report.as_ref().unwrap();
    assert_eq!(report.failure_units, 1);
    assert_eq!(report.failure_messages, vec!["segment 2 failed".to_string()]);

    assert_eq!(ops.calls(Stage::Evaluate), 1);

    Ok(())
}

#[tokio::test]
async fn unexpected_fault_is_captured_as_stage_failure() -> Result<()> {
    let root = TempDir::new()?;
    let ops = Arc::new(ScriptedOps::new().with(Stage::Summary, Outcome::Fault));
    let run_log = Arc::new(MemoryRunLog::new());
    let pipeline = orchestrator(&root, ops.clone(), run_log.clone());

    // The fault never propagates out of the orchestrator
    let result = pipeline.run_full_pipeline("lecture-5").await?;

    assert_eq!(result.stages.len(), 4);
    let failed = result.first_failure().unwrap();
    assert_eq!(failed.stage, Stage::Summary);
    assert!(failed.error.as_deref().unwrap().contains("transcoder exploded"));

    let runs = run_log.runs_for_subject("lecture-5").await?;
    let summary_run = runs.iter().find(|r| r.stage == Stage::Summary).unwrap();
    assert_eq!(summary_run.status, StageStatus::Failed);
    assert!(summary_run
        .error_message
        .as_deref()
        .unwrap()
        .contains("transcoder exploded"));

    assert_eq!(ops.calls(Stage::Evaluate), 0);

    Ok(())
}

#[tokio::test]
async fn rerun_skips_stages_completed_by_first_run() -> Result<()> {
    let root = TempDir::new()?;
    let ops = Arc::new(ScriptedOps::new());
    let run_log = Arc::new(MemoryRunLog::new());
    let pipeline = orchestrator(&root, ops.clone(), run_log.clone());

    // Simulate the first run leaving cut artifacts behind, then a rerun
    let segments = root.path().join("lecture-6").join("segments");
    fs::create_dir_all(&segments)?;
    fs::write(segments.join("part-000.mp4"), b"x")?;

    let first = pipeline.run_full_pipeline("lecture-6").await?;
    assert_eq!(first.stages[0].disposition, StageDisposition::Skipped);
    assert_eq!(ops.calls(Stage::CutVideo), 0);

    let second = pipeline.run_full_pipeline("lecture-6").await?;
    assert_eq!(second.stages[0].disposition, StageDisposition::Skipped);
    assert_eq!(ops.calls(Stage::CutVideo), 0);

    // Two invocations → two skip records for the cut stage, distinct run ids
    let runs = run_log.runs_for_subject("lecture-6").await?;
    let cut_runs: Vec<_> = runs.iter().filter(|r| r.stage == Stage::CutVideo).collect();
    assert_eq!(cut_runs.len(), 2);
    assert_ne!(cut_runs[0].run_id, cut_runs[1].run_id);

    Ok(())
}
