use super::process::CaptureProcess;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One active capture, created only after the process reported ready.
///
/// The process handle lives here exclusively; it moves out with the session
/// on stop and is dropped exactly once.
pub struct RecordingSession {
    pub recording_id: Uuid,
    pub file_path: PathBuf,
    pub file_name: String,
    pub content_type: String,
    /// Destination lesson for the finished recording
    pub lesson_id: Option<u64>,
    pub started_at: DateTime<Utc>,
    pub(crate) process: Box<dyn CaptureProcess>,
}

/// Active recording sessions (recording_id → session).
///
/// Insert and remove are atomic under one lock, and `remove` yields a given
/// session at most once, so exactly one caller can run the stop sequence
/// for an id.
#[derive(Default)]
pub struct RecordingRegistry {
    sessions: RwLock<HashMap<Uuid, RecordingSession>>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: RecordingSession) {
        self.sessions
            .write()
            .await
            .insert(session.recording_id, session);
    }

    pub async fn remove(&self, recording_id: Uuid) -> Option<RecordingSession> {
        self.sessions.write().await.remove(&recording_id)
    }

    pub async fn contains(&self, recording_id: Uuid) -> bool {
        self.sessions.read().await.contains_key(&recording_id)
    }

    pub async fn active_ids(&self) -> Vec<Uuid> {
        self.sessions.read().await.keys().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct NullProcess;

    #[async_trait]
    impl CaptureProcess for NullProcess {
        fn diagnostics(&mut self) -> Option<mpsc::Receiver<String>> {
            None
        }
        fn has_exited(&mut self) -> bool {
            true
        }
        async fn request_stop(&mut self) -> Result<()> {
            Ok(())
        }
        async fn wait(&mut self) -> Result<()> {
            Ok(())
        }
        async fn kill(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn session(recording_id: Uuid) -> RecordingSession {
        RecordingSession {
            recording_id,
            file_path: PathBuf::from("/tmp/out.mp4"),
            file_name: "out.mp4".to_string(),
            content_type: "video/mp4".to_string(),
            lesson_id: None,
            started_at: Utc::now(),
            process: Box::new(NullProcess),
        }
    }

    #[tokio::test]
    async fn remove_yields_a_session_at_most_once() {
        let registry = RecordingRegistry::new();
        let id = Uuid::new_v4();
        registry.insert(session(id)).await;

        assert!(registry.contains(id).await);
        assert!(registry.remove(id).await.is_some());
        assert!(registry.remove(id).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn independent_sessions_coexist() {
        let registry = RecordingRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        registry.insert(session(a)).await;
        registry.insert(session(b)).await;

        assert_eq!(registry.len().await, 2);
        registry.remove(a).await;
        assert!(registry.contains(b).await);
        assert_eq!(registry.active_ids().await, vec![b]);
    }
}
