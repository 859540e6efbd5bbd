use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;

use crate::acquisition::service::NO_TRANSCRIPT_SENTINEL;
use crate::config::TranscriptionConfig;
use crate::process::run_bounded;
use crate::{PipelineError, Result};

/// Upload extensions the transcription script accepts
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["mp3", "mp4"];

/// Speech-to-text for a local media file.
///
/// `Ok(None)` means the transcriber ran but heard nothing usable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechTranscriber: Send + Sync {
    async fn transcribe(&self, media: &Path) -> Result<Option<String>>;
}

/// An uploaded file copied into a private staging directory.
///
/// The staging directory lives as long as this value; call [`close`] to
/// remove it and log any failure.
///
/// [`close`]: UploadedMedia::close
#[derive(Debug)]
pub struct UploadedMedia {
    staging: TempDir,
    path: PathBuf,
    title: String,
}

impl UploadedMedia {
    /// Check the extension of `source` and stage a copy of it.
    pub async fn stage(source: &Path) -> Result<Self> {
        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(PipelineError::UnsupportedUpload(source.display().to_string()).into());
        }

        if !source.is_file() {
            return Err(PipelineError::InvalidInput(format!("No such file: {}", source.display())).into());
        }

        let title = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "transcript".to_string());

        let staging = TempDir::new().context("Failed to create staging directory")?;
        let path = staging.path().join(format!("upload.{}", extension));
        tokio::fs::copy(source, &path)
            .await
            .with_context(|| format!("Failed to stage {}", source.display()))?;

        tracing::debug!("Staged upload {} at {}", source.display(), path.display());

        Ok(Self { staging, path, title })
    }

    /// Path of the staged copy
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File stem of the original upload
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn close(self) {
        let location = self.staging.path().display().to_string();
        if let Err(e) = self.staging.close() {
            tracing::warn!("Failed to remove staging directory {}: {}", location, e);
        }
    }
}

/// Runs the external transcription script: `<python> <script> <media>`.
pub struct ScriptTranscriber {
    interpreter: String,
    script: PathBuf,
    timeout: Duration,
}

impl ScriptTranscriber {
    pub fn new(config: &TranscriptionConfig) -> Self {
        Self {
            interpreter: config.python_path.clone(),
            script: config.script_path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }
}

#[async_trait]
impl SpeechTranscriber for ScriptTranscriber {
    async fn transcribe(&self, media: &Path) -> Result<Option<String>> {
        tracing::info!("Transcribing {}", media.display());

        let mut command = Command::new(&self.interpreter);
        command.arg(&self.script).arg(media);

        let output = run_bounded(command, "transcription", self.timeout).await?;
        Ok(join_transcript_lines(&output.stdout))
    }
}

/// Join the script's stdout lines with spaces.
///
/// Returns `None` for empty output or the no-transcript sentinel.
pub fn join_transcript_lines(stdout: &str) -> Option<String> {
    let text = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() || text == NO_TRANSCRIPT_SENTINEL {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_transcript_lines() {
        assert_eq!(
            join_transcript_lines("hello there\n\n  general kenobi \n").as_deref(),
            Some("hello there general kenobi")
        );
        assert_eq!(join_transcript_lines(""), None);
        assert_eq!(join_transcript_lines("  \n \n"), None);
        assert_eq!(join_transcript_lines("NO_TRANSCRIPT_AVAILABLE\n"), None);
    }

    #[tokio::test]
    async fn test_stage_rejects_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("notes.wav");
        std::fs::write(&source, b"RIFF").unwrap();

        let err = UploadedMedia::stage(&source).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UnsupportedUpload(_))
        ));
    }

    #[tokio::test]
    async fn test_stage_missing_file_is_invalid_input() {
        let err = UploadedMedia::stage(Path::new("/definitely/not/here.mp3")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_stage_copies_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("Weekly Standup.MP4");
        std::fs::write(&source, b"fake media").unwrap();

        let staged = UploadedMedia::stage(&source).await.unwrap();
        assert_eq!(staged.title(), "Weekly Standup");
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"fake media");
        assert!(staged.path().to_string_lossy().ends_with("upload.mp4"));

        let staged_path = staged.path().to_path_buf();
        staged.close();
        assert!(!staged_path.exists());
        assert!(source.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_transcriber_joins_stdout() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("transcribe.sh");
        std::fs::write(&script, "echo \"first line for $1\"\necho\necho second line\n").unwrap();

        let transcriber = ScriptTranscriber {
            interpreter: "sh".to_string(),
            script,
            timeout: Duration::from_secs(10),
        };

        let text = transcriber.transcribe(Path::new("clip.mp3")).await.unwrap();
        assert_eq!(text.as_deref(), Some("first line for clip.mp3 second line"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_transcriber_failure_is_error() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("broken.sh");
        std::fs::write(&script, "echo boom >&2\nexit 3\n").unwrap();

        let transcriber = ScriptTranscriber {
            interpreter: "sh".to_string(),
            script,
            timeout: Duration::from_secs(10),
        };

        assert!(transcriber.transcribe(Path::new("clip.mp3")).await.is_err());
    }
}
