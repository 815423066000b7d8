//! Engine supervision: progress, cancellation, supervised runs and the
//! two-pass loudness protocol

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{ReelcutError, ReelcutResult};

pub mod cancel;
pub mod loudnorm;
pub mod progress;
pub mod supervisor;

pub use cancel::CancelToken;
pub use loudnorm::{LoudnessMeasurement, LoudnessNormalizer, LoudnessTarget};
pub use progress::{ProgressReporter, ProgressStyle};
pub use supervisor::{stderr_tail, EngineJob, EngineOutput, TranscodeSupervisor};

/// Captured output of a short engine invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

/// Run a short, unsupervised engine command (probes, still synthesis,
/// peak extraction) to completion. Killed if `cancel` fires first.
pub async fn run_to_completion(
    mut command: Command,
    cancel: &CancelToken,
) -> ReelcutResult<CommandOutput> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!(?command, "Running engine command");

    let child = command.spawn().map_err(|e| ReelcutError::EngineSpawn {
        message: e.to_string(),
    })?;

    let output = tokio::select! {
        output = child.wait_with_output() => output?,
        _ = cancel.cancelled() => {
            // dropping the future drops the child, and kill_on_drop reaps it
            warn!("Engine command cancelled");
            return Err(ReelcutError::Cancelled);
        }
    };

    Ok(CommandOutput {
        success: output.status.success(),
        status: output.status.to_string(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_to_completion_captures_output() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("echo out; echo err >&2; exit 2");
        let output = run_to_completion(command, &CancelToken::new()).await.unwrap();
        assert!(!output.success);
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn test_run_to_completion_respects_cancel() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut command = Command::new("sh");
        command.arg("-c").arg("exec sleep 30");
        let err = run_to_completion(command, &cancel).await.unwrap_err();
        assert!(matches!(err, ReelcutError::Cancelled));
    }
}
