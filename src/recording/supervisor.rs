use super::process::{CaptureProcess, ProcessLauncher};
use super::registry::{RecordingRegistry, RecordingSession};
use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Recording lifecycle failures surfaced to callers
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("stream url must not be empty")]
    EmptyStreamUrl,

    #[error("capture process could not attach to the stream: {last_line}")]
    ConnectFailed { last_line: String },

    #[error("capture process did not attach within {0:?}")]
    ConnectTimeout(Duration),

    #[error("no active recording with id {0}")]
    NotFound(Uuid),

    #[error("recording stopped but no output file was produced at {}", .0.display())]
    OutputMissing(PathBuf),

    #[error("recording stopped but the output file at {} is empty", .0.display())]
    OutputEmpty(PathBuf),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Tunables for capture supervision
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Where finished recordings land
    pub recordings_dir: PathBuf,

    /// How long to wait for a readiness signature before giving up on a
    /// stream that never answers
    pub ready_timeout: Duration,

    /// How long a graceful stop may take before forced termination
    pub grace_period: Duration,
}

impl SupervisorConfig {
    pub fn new(recordings_dir: impl Into<PathBuf>) -> Self {
        Self {
            recordings_dir: recordings_dir.into(),
            ready_timeout: Duration::from_secs(10),
            grace_period: Duration::from_secs(10),
        }
    }
}

/// Accepted start, returned once the capture process reported ready
#[derive(Debug, Clone, Serialize)]
pub struct StartedRecording {
    pub recording_id: Uuid,
    pub file_name: String,
}

/// Finished recording handed back by `stop`
#[derive(Debug, Clone, Serialize)]
pub struct RecordingArtifact {
    pub recording_id: Uuid,
    pub file_path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub lesson_id: Option<u64>,
}

/// Diagnostic-line classification against the known capture signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineSignal {
    /// The process attached to its input stream
    Established,
    /// A fatal connection error; the process will not recover
    Fatal,
}

const ESTABLISHED_INPUT: &str = "Input #0,";
const ESTABLISHED_STREAM: &str = "Stream #0:";
const FATAL_SIGNATURES: [&str; 4] = [
    "Connection refused",
    "Operation timed out",
    "No such file or directory",
    "Invalid data found when processing input",
];

fn classify_line(line: &str) -> Option<LineSignal> {
    if line.contains(ESTABLISHED_INPUT)
        || (line.contains(ESTABLISHED_STREAM)
            && (line.contains("Video:") || line.contains("Audio:")))
    {
        return Some(LineSignal::Established);
    }
    if FATAL_SIGNATURES.iter().any(|sig| line.contains(sig)) {
        return Some(LineSignal::Fatal);
    }
    None
}

/// Outcome of the readiness race
enum Readiness {
    Ready,
    Failed { last_line: String },
}

/// Owns the lifecycle of externally-spawned capture processes: start with
/// asynchronous readiness detection, registry membership while live, and
/// graceful-then-forced stop with guaranteed handle release.
pub struct ProcessSupervisor {
    launcher: Arc<dyn ProcessLauncher>,
    registry: Arc<RecordingRegistry>,
    config: SupervisorConfig,
}

impl ProcessSupervisor {
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        registry: Arc<RecordingRegistry>,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            launcher,
            registry,
            config,
        }
    }

    /// Start capturing `stream_url`.
    ///
    /// The call resolves to ready only when a connection-established
    /// signature shows up on the diagnostic stream. A fatal signature, the
    /// process exiting on its own, or the ready timeout all resolve to
    /// failure; in every failure case the process is terminated and never
    /// registered.
    pub async fn start(
        &self,
        stream_url: &str,
        lesson_id: Option<u64>,
    ) -> Result<StartedRecording, RecordingError> {
        if stream_url.trim().is_empty() {
            return Err(RecordingError::EmptyStreamUrl);
        }

        std::fs::create_dir_all(&self.config.recordings_dir)
            .context("failed to create recordings directory")?;

        let file_name = format!(
            "{}_{}.mp4",
            Utc::now().format("%Y%m%d%H%M%S"),
            Uuid::new_v4().simple()
        );
        let file_path = self.config.recordings_dir.join(&file_name);

        let mut process = self
            .launcher
            .launch(stream_url, &file_path)
            .await
            .context("failed to launch capture process")?;

        let diagnostics = process
            .diagnostics()
            .context("capture process offered no diagnostic stream")?;

        // Single-resolution signal: the watcher resolves it exactly once,
        // whichever of {established, fatal line, stream EOF} comes first
        let (ready_tx, ready_rx) = oneshot::channel();
        tokio::spawn(watch_diagnostics(diagnostics, ready_tx));

        match tokio::time::timeout(self.config.ready_timeout, ready_rx).await {
            Err(_) => {
                // Nothing decisive within the budget: the process is stuck
                // waiting on a stream that never answers
                warn!(
                    "Capture start timed out after {:?}, killing process",
                    self.config.ready_timeout
                );
                if let Err(e) = process.kill().await {
                    debug!("Kill after start timeout failed: {}", e);
                }
                Err(RecordingError::ConnectTimeout(self.config.ready_timeout))
            }
            Ok(Ok(Readiness::Ready)) => {
                let recording_id = Uuid::new_v4();
                info!(
                    "Recording {} attached to {} -> {}",
                    recording_id,
                    stream_url,
                    file_path.display()
                );
                self.registry
                    .insert(RecordingSession {
                        recording_id,
                        file_path,
                        file_name: file_name.clone(),
                        content_type: "video/mp4".to_string(),
                        lesson_id,
                        started_at: Utc::now(),
                        process,
                    })
                    .await;
                Ok(StartedRecording {
                    recording_id,
                    file_name,
                })
            }
            Ok(Ok(Readiness::Failed { last_line })) => {
                warn!("Capture failed to attach: {}", last_line);
                if let Err(e) = process.kill().await {
                    debug!("Kill after failed attach failed: {}", e);
                }
                Err(RecordingError::ConnectFailed { last_line })
            }
            Ok(Err(_)) => {
                // Watcher dropped the signal without resolving it
                if let Err(e) = process.kill().await {
                    debug!("Kill after lost readiness signal failed: {}", e);
                }
                Err(RecordingError::ConnectFailed {
                    last_line: String::new(),
                })
            }
        }
    }

    /// Stop a recording and hand back the finished artifact.
    ///
    /// The session leaves the registry before anything else happens, so a
    /// concurrent second stop for the same id gets `NotFound`. The process
    /// handle is owned by this scope and dropped exactly once on every
    /// return path.
    pub async fn stop(&self, recording_id: Uuid) -> Result<RecordingArtifact, RecordingError> {
        let Some(mut session) = self.registry.remove(recording_id).await else {
            return Err(RecordingError::NotFound(recording_id));
        };

        let process = &mut session.process;

        if process.has_exited() {
            debug!("Recording {} process already exited", recording_id);
        } else {
            if let Err(e) = process.request_stop().await {
                // Escalation below still runs
                debug!("Graceful stop request failed: {}", e);
            }

            match tokio::time::timeout(self.config.grace_period, process.wait()).await {
                Ok(Ok(())) => debug!("Recording {} stopped gracefully", recording_id),
                Ok(Err(e)) => warn!("Waiting for capture exit failed: {}", e),
                Err(_) => {
                    warn!(
                        "Recording {} ignored graceful stop for {:?}, killing",
                        recording_id, self.config.grace_period
                    );
                    if let Err(e) = process.kill().await {
                        error!("Forced kill of recording {} failed: {}", recording_id, e);
                    }
                    if let Err(e) = process.wait().await {
                        warn!("Waiting after forced kill failed: {}", e);
                    }
                }
            }
        }

        let metadata = match std::fs::metadata(&session.file_path) {
            Ok(meta) => meta,
            Err(_) => {
                warn!(
                    "Recording {} stopped but produced no file at {}",
                    recording_id,
                    session.file_path.display()
                );
                return Err(RecordingError::OutputMissing(session.file_path.clone()));
            }
        };

        if metadata.len() == 0 {
            warn!(
                "Recording {} stopped but the file at {} is empty",
                recording_id,
                session.file_path.display()
            );
            return Err(RecordingError::OutputEmpty(session.file_path.clone()));
        }

        info!(
            "Recording {} saved: {} ({} bytes)",
            recording_id,
            session.file_path.display(),
            metadata.len()
        );

        Ok(RecordingArtifact {
            recording_id,
            file_path: session.file_path.clone(),
            file_name: session.file_name.clone(),
            size_bytes: metadata.len(),
            content_type: session.content_type.clone(),
            lesson_id: session.lesson_id,
        })
    }
}

/// Reads diagnostic lines until the channel closes, resolving the readiness
/// signal exactly once. Lines after resolution are still drained so the
/// process never blocks on a full pipe.
async fn watch_diagnostics(mut lines: mpsc::Receiver<String>, ready_tx: oneshot::Sender<Readiness>) {
    let mut slot = Some(ready_tx);
    let mut last_line = String::new();

    while let Some(line) = lines.recv().await {
        if !line.trim().is_empty() {
            last_line = line.clone();
        }

        match classify_line(&line) {
            Some(LineSignal::Established) => {
                if let Some(tx) = slot.take() {
                    let _ = tx.send(Readiness::Ready);
                }
            }
            Some(LineSignal::Fatal) => {
                error!("Capture diagnostic error: {}", line);
                if let Some(tx) = slot.take() {
                    let _ = tx.send(Readiness::Failed {
                        last_line: last_line.clone(),
                    });
                }
            }
            None => {}
        }
    }

    // Diagnostic stream closed: the process exited on its own. Exit without
    // an established signature is failure.
    if let Some(tx) = slot.take() {
        let _ = tx.send(Readiness::Failed { last_line });
    }
}
