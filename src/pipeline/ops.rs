use super::stage::{Stage, StageReport};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Boundary for the five external stage operations (cut, convert,
/// transcribe, summarize, evaluate).
///
/// Implementations own their own timeouts and retries; the orchestrator
/// only interprets the returned report. An `Err` is an unexpected fault and
/// halts the pipeline the same way a fully-failed report does.
#[async_trait]
pub trait StageOps: Send + Sync {
    async fn execute(&self, stage: Stage, subject_id: &str) -> Result<StageReport>;
}

/// Runs one configured command per stage and maps its exit status to a
/// one-unit report.
///
/// Command templates are whitespace-split into argv; `{subject}` and
/// `{root}` expand to the subject id and the processing root. Template
/// arguments containing spaces are not supported.
pub struct CommandStageOps {
    processing_root: PathBuf,
    commands: HashMap<Stage, String>,
}

impl CommandStageOps {
    pub fn new(processing_root: impl Into<PathBuf>) -> Self {
        Self {
            processing_root: processing_root.into(),
            commands: HashMap::new(),
        }
    }

    pub fn with_command(mut self, stage: Stage, template: impl Into<String>) -> Self {
        self.commands.insert(stage, template.into());
        self
    }

    fn render(&self, template: &str, subject_id: &str) -> Vec<String> {
        let root = self.processing_root.to_string_lossy();
        template
            .split_whitespace()
            .map(|part| part.replace("{subject}", subject_id).replace("{root}", &root))
            .collect()
    }
}

#[async_trait]
impl StageOps for CommandStageOps {
    async fn execute(&self, stage: Stage, subject_id: &str) -> Result<StageReport> {
        let template = self
            .commands
            .get(&stage)
            .with_context(|| format!("no command configured for stage {}", stage))?;

        let argv = self.render(template, subject_id);
        anyhow::ensure!(!argv.is_empty(), "empty command template for stage {}", stage);

        debug!("Running stage {} command: {:?}", stage, argv);

        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .output()
            .await
            .with_context(|| format!("failed to launch {} for stage {}", argv[0], stage))?;

        if output.status.success() {
            Ok(StageReport::single_success())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let mut tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            tail.reverse();
            Ok(StageReport::single_failure(format!(
                "{} exited with {}: {}",
                argv[0],
                output.status,
                tail.join(" | ")
            )))
        }
    }
}
