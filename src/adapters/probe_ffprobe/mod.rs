//! FFprobe adapter for stream metadata

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::{run_to_completion, CancelToken};
use crate::error::ProbeError;
use crate::ports::{MediaEngine, StreamProbe};
use crate::probe::frame_rate_from_json;

/// FFprobe-based probe adapter
pub struct FfprobeAdapter {
    engine: Arc<dyn MediaEngine>,
}

impl FfprobeAdapter {
    pub fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl StreamProbe for FfprobeAdapter {
    async fn frame_rate(&self, file_path: &Path) -> Result<f64, ProbeError> {
        let mut command = self.engine.ffprobe();
        command
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=r_frame_rate", "-of", "json"])
            .arg(file_path);

        let output = run_to_completion(command, &CancelToken::new())
            .await
            .map_err(|e| ProbeError::FrameRateUnavailable {
                message: e.to_string(),
            })?;
        if !output.success {
            return Err(ProbeError::FrameRateUnavailable {
                message: format!("ffprobe exited with {}: {}", output.status, output.stderr.trim()),
            });
        }
        frame_rate_from_json(&output.stdout)
    }
}
