//! Bounded execution of external tools (yt-dlp, transcription scripts).
//!
//! The child's stderr is drained by a worker task and forwarded to the log so
//! it can never fill its pipe and stall the child; stdout is read on the
//! calling task. The whole exchange is bounded: when the limit elapses the
//! child is killed and the call reports [`ProcessError::Timeout`].

use std::collections::VecDeque;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tokio::task::JoinHandle;

/// Number of trailing stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while talking to {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {}s", .limit.as_secs())]
    Timeout { program: String, limit: Duration },

    #[error("{program} exited with {status}: {stderr_tail}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr_tail: String,
    },
}

/// Captured result of a successful run.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr_tail: String,
}

/// Run `command` to completion within `limit`.
///
/// `label` names the tool in log lines and errors. A non-zero exit status is
/// reported as [`ProcessError::Failed`].
pub async fn run_bounded(
    mut command: Command,
    label: &str,
    limit: Duration,
) -> Result<ProcessOutput, ProcessError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(tool = label, "spawning {:?}", command.as_std());

    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
        program: label.to_string(),
        source,
    })?;

    let diagnostics = child
        .stderr
        .take()
        .map(|stderr| spawn_stderr_drain(stderr, label.to_string()));

    let mut stdout = child.stdout.take();
    let mut captured = String::new();

    let waited = tokio::time::timeout(limit, async {
        if let Some(pipe) = stdout.as_mut() {
            pipe.read_to_string(&mut captured).await?;
        }
        child.wait().await
    })
    .await;

    let status = match waited {
        Ok(Ok(status)) => status,
        Ok(Err(source)) => {
            return Err(ProcessError::Io {
                program: label.to_string(),
                source,
            })
        }
        Err(_) => {
            tracing::warn!(tool = label, "no result after {:?}, killing process", limit);
            if let Err(e) = child.kill().await {
                tracing::warn!(tool = label, "failed to kill timed out process: {}", e);
            }
            return Err(ProcessError::Timeout {
                program: label.to_string(),
                limit,
            });
        }
    };

    let stderr_tail = match diagnostics {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    };

    if !status.success() {
        return Err(ProcessError::Failed {
            program: label.to_string(),
            status,
            stderr_tail,
        });
    }

    Ok(ProcessOutput {
        stdout: captured,
        stderr_tail,
    })
}

fn spawn_stderr_drain(stderr: ChildStderr, label: String) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    tracing::debug!(tool = %label, "{}", line);
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(tool = %label, "stderr closed: {}", e);
                    break;
                }
            }
        }

        Vec::from(tail).join("\n")
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        command
    }

    #[tokio::test]
    async fn test_captures_stdout_and_stderr_tail() {
        let output = run_bounded(
            shell("echo progress >&2; echo hello; echo world"),
            "sh",
            Duration::from_secs(10),
        )
        .await
        .expect("script succeeds");

        assert_eq!(output.stdout, "hello\nworld\n");
        assert_eq!(output.stderr_tail, "progress");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let err = run_bounded(shell("echo boom >&2; exit 3"), "sh", Duration::from_secs(10))
            .await
            .unwrap_err();

        match err {
            ProcessError::Failed { stderr_tail, status, .. } => {
                assert_eq!(stderr_tail, "boom");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let started = std::time::Instant::now();
        let err = run_bounded(shell("sleep 30"), "sh", Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = run_bounded(
            Command::new("definitely-not-a-real-binary-4821"),
            "missing",
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
