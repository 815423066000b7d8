//! Stream metadata helpers and waveform peak extraction

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::ProbeError;
use crate::ports::StreamProbe;

pub mod peaks;

pub use peaks::{PeakData, PeakExtractor};

/// Frame rate used when the source cannot be probed
pub const DEFAULT_FPS: f64 = 30.0;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    r_frame_rate: Option<String>,
}

/// Parse a rational rate such as `30000/1001`. A bare number is accepted.
pub fn parse_frame_rate(value: &str) -> Option<f64> {
    let value = value.trim();
    let fps = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Frame rate of the first stream in ffprobe's
/// `-show_entries stream=r_frame_rate -of json` output
pub fn frame_rate_from_json(stdout: &str) -> Result<f64, ProbeError> {
    let output: ProbeOutput =
        serde_json::from_str(stdout).map_err(|e| ProbeError::FrameRateUnavailable {
            message: format!("unreadable probe output: {}", e),
        })?;
    let raw = output
        .streams
        .first()
        .and_then(|s| s.r_frame_rate.as_deref())
        .ok_or_else(|| ProbeError::FrameRateUnavailable {
            message: "no video stream reported".to_string(),
        })?;
    parse_frame_rate(raw).ok_or_else(|| ProbeError::FrameRateUnavailable {
        message: format!("invalid frame rate '{}'", raw),
    })
}

/// Probe the source frame rate, falling back to [`DEFAULT_FPS`]
pub async fn frame_rate_or_default(probe: &dyn StreamProbe, file_path: &Path) -> f64 {
    match probe.frame_rate(file_path).await {
        Ok(fps) => fps,
        Err(e) => {
            warn!(path = %file_path.display(), "{}; using {} fps", e, DEFAULT_FPS);
            DEFAULT_FPS
        }
    }
}
