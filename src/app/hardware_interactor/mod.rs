// Hardware interactor - capability report and per-job accelerator resolution

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::domain::model::{HardwareChoice, HardwareProfile, HardwareResolution};
use crate::domain::rules::{detect_profile, resolve_profile};
use crate::ports::CapabilityProbe;

/// What the engine offers on this host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HardwareReport {
    pub detected: HardwareProfile,
    pub detected_friendly: String,
    pub available: Vec<String>,
    pub friendly: Vec<String>,
    pub engine_installed: bool,
    pub engine_version: Option<String>,
    pub error: Option<String>,
}

/// Interactor for hardware queries
pub struct HardwareInteractor {
    probe: Arc<dyn CapabilityProbe>,
}

impl HardwareInteractor {
    pub fn new(probe: Arc<dyn CapabilityProbe>) -> Self {
        Self { probe }
    }

    /// Acceleration backends, empty when the probe fails
    pub async fn available(&self) -> Vec<String> {
        match self.probe.hardware_accelerators().await {
            Ok(list) => list,
            Err(e) => {
                warn!("{}; assuming no hardware acceleration", e);
                Vec::new()
            }
        }
    }

    /// Resolve `choice` for one job. Never fails.
    pub async fn resolve(&self, choice: &HardwareChoice) -> HardwareResolution {
        let available = self.available().await;
        resolve_profile(choice, &available)
    }

    pub async fn report(&self) -> HardwareReport {
        let (engine_installed, engine_version, error) = match self.probe.engine_version().await {
            Ok(version) => (true, Some(version), None),
            Err(e) => (
                false,
                None,
                Some(format!(
                    "ffmpeg not found or not runnable ({}). Hardware acceleration not available.",
                    e
                )),
            ),
        };

        let available = if engine_installed {
            self.available().await
        } else {
            Vec::new()
        };
        let friendly = available
            .iter()
            .map(|name| {
                HardwareProfile::from_accelerator_name(name)
                    .map(|p| p.friendly_name().to_string())
                    .unwrap_or_else(|| name.clone())
            })
            .collect();
        let detected = detect_profile(&available);

        HardwareReport {
            detected,
            detected_friendly: detected.friendly_name().to_string(),
            available,
            friendly,
            engine_installed,
            engine_version,
            error,
        }
    }
}
