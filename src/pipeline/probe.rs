use super::stage::Stage;
use std::fs;
use std::path::{Path, PathBuf};

/// Answers "has this stage already produced usable output for this subject?"
/// by inspecting the artifact store. Pure query, no mutation.
///
/// Presence of at least one acceptably-named file counts as prior success.
/// This is a deliberate approximation: a corrupted-but-present artifact
/// still reads as done, and forcing a stage to re-run means removing its
/// artifact directory.
pub struct StageArtifactProbe {
    processing_root: PathBuf,
}

impl StageArtifactProbe {
    pub fn new(processing_root: impl Into<PathBuf>) -> Self {
        Self {
            processing_root: processing_root.into(),
        }
    }

    /// Artifact directory for a stage, under the subject's folder
    pub fn artifact_dir(&self, subject_id: &str, stage: Stage) -> PathBuf {
        self.processing_root
            .join(subject_id)
            .join(Self::stage_dir(stage))
    }

    /// True if the stage's artifact location already holds acceptable output
    pub fn stage_completed(&self, subject_id: &str, stage: Stage) -> bool {
        has_files_with_extensions(
            &self.artifact_dir(subject_id, stage),
            Self::stage_extensions(stage),
        )
    }

    fn stage_dir(stage: Stage) -> &'static str {
        match stage {
            Stage::CutVideo => "segments",
            Stage::ConvertAudio => "audio",
            Stage::Transcribe => "transcripts",
            Stage::Summary => "summaries",
            Stage::Evaluate => "evaluations",
        }
    }

    /// Acceptable artifact extensions per stage; an empty slice accepts any
    /// file (cut segments keep whatever container the source had)
    fn stage_extensions(stage: Stage) -> &'static [&'static str] {
        match stage {
            Stage::CutVideo => &[],
            Stage::ConvertAudio => &["mp3", "wav", "m4a", "flac"],
            Stage::Transcribe | Stage::Summary => &["txt", "md"],
            Stage::Evaluate => &["pdf", "docx", "html", "htm", "txt", "md"],
        }
    }
}

fn has_files_with_extensions(dir: &Path, extensions: &[&str]) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if extensions.is_empty() {
            return true;
        }
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if extensions.contains(&ext.to_ascii_lowercase().as_str()) {
                return true;
            }
        }
    }

    false
}
