//! Supervision of one long-running engine process.
//!
//! The engine writes `key=value` progress records to its stdout
//! (`-progress pipe:1`). A monitor task turns `out_time_us` into percent
//! values while the foreground waits for the process, a drain task collects
//! stderr for diagnostics, and both tasks are joined before a normal return.

use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::engine::cancel::CancelToken;
use crate::engine::progress::{monitor_progress, ProgressReporter};
use crate::error::{ReelcutError, ReelcutResult};
use crate::ports::MediaEngine;

/// Number of stderr lines kept in a [`ReelcutError::TranscodeFailed`]
const STDERR_TAIL_LINES: usize = 12;

/// One engine invocation to supervise
#[derive(Debug, Clone)]
pub struct EngineJob {
    /// Arguments after the supervisor's own global flags
    pub args: Vec<String>,
    /// Expected output duration, the percent denominator
    pub duration_seconds: f64,
    /// Progress message while the job runs
    pub label: String,
}

/// What a successful run leaves behind
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub stderr: String,
    pub progress_records: usize,
}

/// Launches the engine and supervises it to completion
pub struct TranscodeSupervisor<'a> {
    engine: &'a dyn MediaEngine,
    reporter: &'a ProgressReporter,
    cancel: &'a CancelToken,
}

impl<'a> TranscodeSupervisor<'a> {
    pub fn new(
        engine: &'a dyn MediaEngine,
        reporter: &'a ProgressReporter,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            engine,
            reporter,
            cancel,
        }
    }

    /// Run `job` to completion. Percent is forced to 100 when the process
    /// exits successfully; the reporter is inactive again on every return.
    pub async fn run(&self, job: &EngineJob) -> ReelcutResult<EngineOutput> {
        if self.cancel.is_cancelled() {
            return Err(ReelcutError::Cancelled);
        }

        let _operation = self.reporter.begin(job.label.clone());
        let started = Instant::now();

        let mut command = self.engine.ffmpeg();
        command
            .args(["-hide_banner", "-nostats", "-y", "-progress", "pipe:1"])
            .args(&job.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!(args = ?job.args, "Launching engine");

        let mut child = command.spawn().map_err(|e| ReelcutError::EngineSpawn {
            message: e.to_string(),
        })?;
        info!(pid = child.id(), label = %job.label, "Engine process started");

        let stdout = child.stdout.take().ok_or_else(|| ReelcutError::EngineSpawn {
            message: "engine stdout was not captured".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| ReelcutError::EngineSpawn {
            message: "engine stderr was not captured".to_string(),
        })?;

        let monitor = tokio::spawn(monitor_progress(
            BufReader::new(stdout),
            job.duration_seconds,
            self.reporter.clone(),
        ));
        // drained concurrently so a chatty engine never blocks on a full pipe
        let drain = tokio::spawn(async move {
            let mut output = String::new();
            let mut reader = BufReader::new(stderr);
            if let Err(e) = reader.read_to_string(&mut output).await {
                output.push_str(&format!("\n<failed to read engine stderr: {}>", e));
            }
            output
        });

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = self.cancel.cancelled() => {
                warn!(label = %job.label, "Cancelling engine process");
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill engine process: {}", e);
                }
                monitor.abort();
                drain.abort();
                return Err(ReelcutError::Cancelled);
            }
        };

        let progress_records = monitor.await.unwrap_or_else(|e| {
            warn!("Progress monitor ended abnormally: {}", e);
            0
        });
        let stderr = drain.await.unwrap_or_else(|e| {
            warn!("Stderr drain ended abnormally: {}", e);
            String::new()
        });

        if !status.success() {
            warn!(%status, label = %job.label, "Engine process failed");
            return Err(ReelcutError::TranscodeFailed {
                status: status.to_string(),
                stderr_tail: stderr_tail(&stderr, STDERR_TAIL_LINES),
            });
        }

        // exit is authoritative; the last record may have rounded below 100
        self.reporter.advance(100);
        info!(
            label = %job.label,
            elapsed_secs = started.elapsed().as_secs_f64(),
            progress_records,
            "Engine process completed"
        );

        Ok(EngineOutput {
            stderr,
            progress_records,
        })
    }
}

/// Last `lines` non-empty lines of `text`
pub fn stderr_tail(text: &str, lines: usize) -> String {
    let kept: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect();
    kept[kept.len().saturating_sub(lines)..].join("\n")
}
