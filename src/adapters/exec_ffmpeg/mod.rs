//! FFmpeg execution adapter
//!
//! Launches the `ffmpeg`/`ffprobe` command-line tools and answers capability
//! queries from `ffmpeg -hwaccels`.

use std::ffi::OsString;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::rules::parse_accelerator_list;
use crate::engine::{run_to_completion, CancelToken};
use crate::error::{ProbeError, ReelcutError};
use crate::ports::{CapabilityProbe, MediaEngine};

/// Engine binaries resolved from configuration or `PATH`
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: OsString,
    ffprobe: OsString,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegEngine {
    pub fn new(ffmpeg: impl Into<OsString>, ffprobe: impl Into<OsString>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

impl MediaEngine for FfmpegEngine {
    fn ffmpeg(&self) -> Command {
        Command::new(&self.ffmpeg)
    }

    fn ffprobe(&self) -> Command {
        Command::new(&self.ffprobe)
    }
}

/// Capability probe backed by `ffmpeg -hwaccels`
pub struct FfmpegCapabilityProbe {
    engine: Arc<dyn MediaEngine>,
}

impl FfmpegCapabilityProbe {
    pub fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self { engine }
    }

    async fn query(&self, args: &[&str]) -> Result<String, ProbeError> {
        let mut command = self.engine.ffmpeg();
        command.args(args);
        let output = run_to_completion(command, &CancelToken::new())
            .await
            .map_err(|e| match e {
                ReelcutError::EngineSpawn { message } => ProbeError::EngineProbeFailed {
                    message: format!("engine not found: {}", message),
                },
                other => ProbeError::EngineProbeFailed {
                    message: other.to_string(),
                },
            })?;
        if !output.success {
            return Err(ProbeError::EngineProbeFailed {
                message: format!("engine exited with {}", output.status),
            });
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl CapabilityProbe for FfmpegCapabilityProbe {
    async fn hardware_accelerators(&self) -> Result<Vec<String>, ProbeError> {
        let stdout = self.query(&["-hide_banner", "-hwaccels"]).await?;
        let accelerators = parse_accelerator_list(&stdout);
        debug!(?accelerators, "Engine acceleration backends");
        Ok(accelerators)
    }

    async fn engine_version(&self) -> Result<String, ProbeError> {
        let stdout = self.query(&["-version"]).await?;
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }
}
