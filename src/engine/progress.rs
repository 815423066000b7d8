//! Progress tracking for supervised engine runs and console/JSON rendering
//! for CLI usage

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::domain::model::ProgressState;

/// Extract `out_time_us` from one `key=value` progress record
pub fn parse_out_time_us(line: &str) -> Option<u64> {
    let (key, value) = line.trim().split_once('=')?;
    if key.trim() != "out_time_us" {
        return None;
    }
    // "N/A" and negative values show up before the first frame
    value.trim().parse::<u64>().ok()
}

/// `min(100, floor(out_time_us / (duration * 1e6) * 100))`
pub fn percent_for(out_time_us: u64, duration_seconds: f64) -> Option<u8> {
    if !(duration_seconds > 0.0) {
        return None;
    }
    let ratio = out_time_us as f64 / (duration_seconds * 1_000_000.0);
    Some((ratio * 100.0).floor().min(100.0) as u8)
}

/// Per-job progress publisher. Cloning shares the same state; subscribers
/// receive every published change.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Arc<watch::Sender<ProgressState>>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ProgressState {
        self.tx.borrow().clone()
    }

    /// Reset to `{0, message, true}`. The returned guard finishes the
    /// operation when dropped, whichever way the caller leaves.
    pub fn begin(&self, message: impl Into<String>) -> ActiveOperation<'_> {
        self.tx.send_replace(ProgressState::started(message));
        ActiveOperation { reporter: self }
    }

    /// Publish a new percent. Lower values than the current one and
    /// updates outside an active operation are ignored.
    pub fn advance(&self, percent: u8) -> bool {
        let percent = percent.min(100);
        self.tx.send_if_modified(|state| {
            if state.active && percent > state.percent {
                state.percent = percent;
                true
            } else {
                false
            }
        })
    }

    /// Set `{100, "", false}`
    pub fn finish(&self) {
        self.tx.send_replace(ProgressState::finished());
    }
}

/// Guard for one long-running operation
#[must_use = "dropping the guard finishes the operation"]
pub struct ActiveOperation<'a> {
    reporter: &'a ProgressReporter,
}

impl Drop for ActiveOperation<'_> {
    fn drop(&mut self) {
        self.reporter.finish();
    }
}

/// Read `key=value` records until the stream closes, publishing percent
/// values as they are parsed. Returns the number of `out_time_us` records.
pub async fn monitor_progress<R>(reader: R, duration_seconds: f64, reporter: ProgressReporter) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut records = 0;
    while let Ok(Some(line)) = lines.next_line().await {
        let Some(out_time_us) = parse_out_time_us(&line) else {
            continue;
        };
        records += 1;
        if let Some(percent) = percent_for(out_time_us, duration_seconds) {
            if reporter.advance(percent) {
                trace!(percent, "Progress advanced");
            }
        }
    }
    records
}

/// How progress is printed by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStyle {
    /// Single-line bar on stderr
    Console,
    /// One JSON event per change on stdout
    Json,
    /// Print nothing
    Silent,
}

/// Render every progress change until all reporters are dropped
pub fn spawn_printer(mut rx: watch::Receiver<ProgressState>, style: ProgressStyle) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            match style {
                ProgressStyle::Console => eprint!("{}", console_line(&state)),
                ProgressStyle::Json => println!("{}", json_event(&state)),
                ProgressStyle::Silent => {}
            }
        }
        if style == ProgressStyle::Console {
            eprintln!();
        }
    })
}

fn console_line(state: &ProgressState) -> String {
    const BAR_LENGTH: usize = 20;
    let filled = state.percent as usize * BAR_LENGTH / 100;
    let bar = "#".repeat(filled) + &"-".repeat(BAR_LENGTH - filled);
    format!("\r[{}] {:>3}% {:<32}", bar, state.percent, state.message)
}

fn json_event(state: &ProgressState) -> serde_json::Value {
    serde_json::json!({
        "event": if state.active { "progress" } else { "idle" },
        "percent": state.percent,
        "message": state.message,
        "active": state.active,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}
