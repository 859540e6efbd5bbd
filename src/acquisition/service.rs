use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

use super::{RetrievalOutcome, TranscriptStrategy};
use crate::captions;
use crate::process;

/// Printed by transcript helper scripts when they have nothing to offer.
pub const NO_TRANSCRIPT_SENTINEL: &str = "NO_TRANSCRIPT_AVAILABLE";

/// Strategy backed by an external transcript helper script.
///
/// The script receives the video id as its only argument and prints the
/// transcript on stdout, or [`NO_TRANSCRIPT_SENTINEL`].
pub struct ExternalServiceStrategy {
    interpreter: String,
    script: PathBuf,
    timeout: Duration,
}

impl ExternalServiceStrategy {
    pub fn new(interpreter: impl Into<String>, script: PathBuf, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            script,
            timeout,
        }
    }
}

#[async_trait]
impl TranscriptStrategy for ExternalServiceStrategy {
    fn name(&self) -> &'static str {
        "transcript-service"
    }

    async fn attempt(&self, video_id: &str) -> RetrievalOutcome {
        let mut command = Command::new(&self.interpreter);
        command.arg(&self.script).arg(video_id);

        match process::run_bounded(command, "transcript-service", self.timeout).await {
            Ok(output) => interpret_output(&output.stdout),
            Err(e) => RetrievalOutcome::Failure(e.to_string()),
        }
    }
}

/// Map helper output to an outcome; the sentinel and short output are failures.
pub fn interpret_output(stdout: &str) -> RetrievalOutcome {
    let text = stdout.trim();
    if text == NO_TRANSCRIPT_SENTINEL {
        RetrievalOutcome::Failure("service reported no transcript".to_string())
    } else if !captions::is_usable(text) {
        RetrievalOutcome::Failure(format!("service output too short ({} chars)", text.chars().count()))
    } else {
        RetrievalOutcome::Success(text.to_string())
    }
}
