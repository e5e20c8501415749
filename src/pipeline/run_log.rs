use super::stage::{Stage, StageStatus};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// One attempt at one stage for one subject.
///
/// Records are append-only except for the single in-place update that takes
/// a `running` record to its terminal status; history is never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRun {
    /// Record identity, the target of whole-record updates
    pub id: Uuid,

    /// Opaque identifier of the video/lecture being processed
    pub subject_id: String,

    /// Groups the five stage attempts belonging to one pipeline invocation
    pub run_id: Uuid,

    pub stage: Stage,

    pub status: StageStatus,

    pub started_at: DateTime<Utc>,

    pub finished_at: Option<DateTime<Utc>>,

    /// Failure text, or the human-readable skip reason for skipped records
    pub error_message: Option<String>,
}

/// Contract against the stage-execution record store.
///
/// The production backing store is a database owned by an external
/// collaborator; this trait fixes the record shape and the read/write
/// semantics the core relies on. All writes are whole-record replacements.
#[async_trait]
pub trait RunLog: Send + Sync {
    async fn insert(&self, run: &StageRun) -> Result<()>;

    /// Replace the record with the same `id`
    async fn update(&self, run: &StageRun) -> Result<()>;

    /// All runs for a subject, ordered by start time
    async fn runs_for_subject(&self, subject_id: &str) -> Result<Vec<StageRun>>;
}

/// In-memory run log for tests and single-process deployments
#[derive(Default)]
pub struct MemoryRunLog {
    runs: RwLock<Vec<StageRun>>,
}

impl MemoryRunLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunLog for MemoryRunLog {
    async fn insert(&self, run: &StageRun) -> Result<()> {
        self.runs.write().await.push(run.clone());
        Ok(())
    }

    async fn update(&self, run: &StageRun) -> Result<()> {
        let mut runs = self.runs.write().await;
        match runs.iter_mut().find(|r| r.id == run.id) {
            Some(slot) => {
                *slot = run.clone();
                Ok(())
            }
            None => anyhow::bail!("no stage run with id {}", run.id),
        }
    }

    async fn runs_for_subject(&self, subject_id: &str) -> Result<Vec<StageRun>> {
        let runs = self.runs.read().await;
        let mut matching: Vec<StageRun> = runs
            .iter()
            .filter(|r| r.subject_id == subject_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.started_at);
        Ok(matching)
    }
}
