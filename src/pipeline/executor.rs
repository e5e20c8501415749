use super::run_log::{RunLog, StageRun};
use super::stage::{Stage, StageStatus};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Longest error text the run log will persist
pub const MAX_ERROR_LEN: usize = 500;

/// Wraps a single stage execution with start/success/failure bookkeeping
/// against the run log
pub struct StageExecutor {
    run_log: Arc<dyn RunLog>,
}

impl StageExecutor {
    pub fn new(run_log: Arc<dyn RunLog>) -> Self {
        Self { run_log }
    }

    /// Insert a `running` record for a fresh attempt
    pub async fn start(&self, subject_id: &str, run_id: Uuid, stage: Stage) -> Result<StageRun> {
        let run = StageRun {
            id: Uuid::new_v4(),
            subject_id: subject_id.to_string(),
            run_id,
            stage,
            status: StageStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            error_message: None,
        };
        self.run_log.insert(&run).await?;
        Ok(run)
    }

    pub async fn mark_success(&self, run: &mut StageRun) -> Result<()> {
        run.status = StageStatus::Success;
        run.finished_at = Some(Utc::now());
        run.error_message = None;
        self.run_log.update(run).await
    }

    pub async fn mark_failed(&self, run: &mut StageRun, error: &str) -> Result<()> {
        run.status = StageStatus::Failed;
        run.finished_at = Some(Utc::now());
        run.error_message = Some(sanitize_error(error, MAX_ERROR_LEN));
        self.run_log.update(run).await
    }

    /// Record a stage that was not executed because its artifact already
    /// exists. Still a full record, never a bare no-op, so progress queries
    /// have a uniform source of truth.
    pub async fn mark_skipped(
        &self,
        subject_id: &str,
        run_id: Uuid,
        stage: Stage,
        reason: &str,
    ) -> Result<StageRun> {
        let now = Utc::now();
        let run = StageRun {
            id: Uuid::new_v4(),
            subject_id: subject_id.to_string(),
            run_id,
            stage,
            status: StageStatus::Skipped,
            started_at: now,
            finished_at: Some(now),
            error_message: Some(sanitize_error(reason, MAX_ERROR_LEN)),
        };
        self.run_log.insert(&run).await?;
        Ok(run)
    }
}

/// Make error text safe to persist.
///
/// The storage layer rejects characters above the basic multilingual plane
/// (4-byte UTF-8 sequences, mostly emoji in practice), so those are removed
/// outright rather than replaced, and the result is cut to `max_len`
/// characters. Both rules are deterministic.
pub fn sanitize_error(input: &str, max_len: usize) -> String {
    input
        .chars()
        .filter(|c| (*c as u32) <= 0xFFFF)
        .take(max_len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::run_log::MemoryRunLog;
    use super::*;

    #[test]
    fn sanitize_strips_supplementary_plane_chars_without_placeholder() {
        assert_eq!(sanitize_error("disk 💥 full", MAX_ERROR_LEN), "disk  full");
        assert_eq!(sanitize_error("ok: 转码失败", MAX_ERROR_LEN), "ok: 转码失败");
    }

    #[test]
    fn sanitize_truncates_to_exact_length() {
        let long = "x".repeat(MAX_ERROR_LEN + 100);
        assert_eq!(sanitize_error(&long, MAX_ERROR_LEN).chars().count(), MAX_ERROR_LEN);
    }

    #[test]
    fn sanitize_filters_before_truncating() {
        // 600 kept chars after 10 stripped ones must still land on the cap
        let mut input = "🎥".repeat(10);
        input.push_str(&"y".repeat(MAX_ERROR_LEN + 100));
        let out = sanitize_error(&input, MAX_ERROR_LEN);
        assert_eq!(out.chars().count(), MAX_ERROR_LEN);
        assert!(out.chars().all(|c| c == 'y'));
    }

    #[tokio::test]
    async fn bookkeeping_round_trip() {
        let log = Arc::new(MemoryRunLog::new());
        let executor = StageExecutor::new(log.clone());
        let run_id = Uuid::new_v4();

        let mut run = executor
            .start("video-1", run_id, Stage::CutVideo)
            .await
            .unwrap();
        assert_eq!(run.status, StageStatus::Running);
        assert!(run.finished_at.is_none());

        executor.mark_failed(&mut run, "boom 💥").await.unwrap();

        let runs = log.runs_for_subject("video-1").await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, StageStatus::Failed);
        assert_eq!(runs[0].error_message.as_deref(), Some("boom "));
        assert!(runs[0].finished_at.is_some());
    }

    #[tokio::test]
    async fn skip_writes_a_terminal_record() {
        let log = Arc::new(MemoryRunLog::new());
        let executor = StageExecutor::new(log.clone());

        executor
            .mark_skipped("video-1", Uuid::new_v4(), Stage::Summary, "already done")
            .await
            .unwrap();

        let runs = log.runs_for_subject("video-1").await.unwrap();
        assert_eq!(runs[0].status, StageStatus::Skipped);
        assert_eq!(runs[0].error_message.as_deref(), Some("already done"));
        assert_eq!(runs[0].started_at, runs[0].finished_at.unwrap());
    }
}
