use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Handle to a spawned media-capture process.
///
/// Owned exclusively by one recording session; never shared. Dropping the
/// handle releases the underlying process resources, killing the process if
/// it is still running.
#[async_trait]
pub trait CaptureProcess: Send + Sync {
    /// Take the diagnostic line stream. The channel closes when the process
    /// closes its diagnostic output, which normally means it exited.
    /// Callable once; returns `None` afterwards.
    fn diagnostics(&mut self) -> Option<mpsc::Receiver<String>>;

    /// True if the process has already terminated
    fn has_exited(&mut self) -> bool;

    /// Ask the process to stop cooperatively via its interactive input
    async fn request_stop(&mut self) -> Result<()>;

    /// Wait until the process exits
    async fn wait(&mut self) -> Result<()>;

    /// Forcibly terminate the process and wait for exit confirmation
    async fn kill(&mut self) -> Result<()>;
}

/// Spawns capture processes against a stream URL
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(&self, stream_url: &str, output_path: &Path)
        -> Result<Box<dyn CaptureProcess>>;
}

/// Launches ffmpeg in stream-copy mode against a remote stream
pub struct FfmpegLauncher {
    binary: String,
}

impl FfmpegLauncher {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegLauncher {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl ProcessLauncher for FfmpegLauncher {
    async fn launch(
        &self,
        stream_url: &str,
        output_path: &Path,
    ) -> Result<Box<dyn CaptureProcess>> {
        // ffmpeg writes all of its logging to stderr; stdin stays piped so
        // a later 'q' can finish the container cleanly
        let mut child = Command::new(&self.binary)
            .arg("-y")
            .arg("-i")
            .arg(stream_url)
            .arg("-c")
            .arg("copy")
            .arg("-f")
            .arg("mp4")
            .arg(output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.binary))?;

        let stderr = child
            .stderr
            .take()
            .context("capture process stderr was not piped")?;
        let stdin = child.stdin.take();

        let (line_tx, line_rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                trace!("ffmpeg: {}", line);
                if line_tx.send(line).await.is_err() {
                    break;
                }
            }
        });

        Ok(Box::new(FfmpegCapture {
            child,
            stdin,
            diagnostics: Some(line_rx),
        }))
    }
}

struct FfmpegCapture {
    child: Child,
    stdin: Option<ChildStdin>,
    diagnostics: Option<mpsc::Receiver<String>>,
}

#[async_trait]
impl CaptureProcess for FfmpegCapture {
    fn diagnostics(&mut self) -> Option<mpsc::Receiver<String>> {
        self.diagnostics.take()
    }

    fn has_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }

    async fn request_stop(&mut self) -> Result<()> {
        // 'q' tells ffmpeg to stop reading input and finalize the container;
        // closing stdin afterwards makes sure it is seen
        let mut stdin = self
            .stdin
            .take()
            .context("capture stdin already closed")?;
        stdin
            .write_all(b"q")
            .await
            .context("failed to send stop request to capture process")?;
        stdin.flush().await?;
        drop(stdin);
        Ok(())
    }

    async fn wait(&mut self) -> Result<()> {
        let status = self
            .child
            .wait()
            .await
            .context("failed waiting for capture process exit")?;
        debug!("Capture process exited with {}", status);
        Ok(())
    }

    async fn kill(&mut self) -> Result<()> {
        self.child
            .kill()
            .await
            .context("failed to kill capture process")?;
        Ok(())
    }
}
