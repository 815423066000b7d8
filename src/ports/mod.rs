// Ports - Interface definitions (contracts)

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::ProbeError;

/// Port for launching the external media engine and its companion probe
/// tool. Implementations hand back a bare command; callers add arguments
/// and stdio wiring.
pub trait MediaEngine: Send + Sync {
    /// Command for the engine binary (ffmpeg)
    fn ffmpeg(&self) -> Command;

    /// Command for the stream probe binary (ffprobe)
    fn ffprobe(&self) -> Command;
}

/// Port for querying the engine's hardware acceleration backends
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    /// Lower-case backend names as listed by the engine
    async fn hardware_accelerators(&self) -> Result<Vec<String>, ProbeError>;

    /// First line of the engine's version banner; fails when the engine
    /// cannot be launched
    async fn engine_version(&self) -> Result<String, ProbeError>;
}

/// Port for stream metadata queries
#[async_trait]
pub trait StreamProbe: Send + Sync {
    /// Frame rate of the first video stream
    async fn frame_rate(&self, file_path: &Path) -> Result<f64, ProbeError>;
}
