use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub recording: RecordingConfig,
    pub stages: StageCommandConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Root for per-subject stage artifacts (segments/, audio/, ...)
    pub processing_root: String,
    /// Where finished recordings land
    pub recordings_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordingConfig {
    pub ffmpeg_binary: String,
    pub ready_timeout_secs: u64,
    pub grace_period_secs: u64,
}

impl RecordingConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

/// Command template per pipeline stage; `{subject}` and `{root}` expand at
/// execution time
#[derive(Debug, Deserialize)]
pub struct StageCommandConfig {
    pub cut_video: String,
    pub convert_audio: String,
    pub transcribe: String,
    pub summary: String,
    pub evaluate: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
