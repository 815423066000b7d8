// Business rules - accelerator resolution

use tracing::{info, warn};

use crate::domain::model::{HardwareChoice, HardwareProfile, HardwareResolution};
use crate::error::ProbeError;


/// Normalise the raw `-hwaccels` output into lower-case backend names.
/// The "Hardware acceleration methods:" header and blank lines are dropped.
pub fn parse_accelerator_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .filter(|line| !line.to_ascii_lowercase().starts_with("hardware"))
        .map(|line| line.to_ascii_lowercase())
        .collect()
}

/// Pick the best profile the engine offers, cpu when it offers none
pub fn detect_profile(available: &[String]) -> HardwareProfile {
    HardwareProfile::PRIORITY
        .into_iter()
        .find(|profile| offers(available, *profile))
        .unwrap_or(HardwareProfile::Cpu)
}

/// Resolve a request against the probed capability list. Never fails: an
/// unavailable or unknown accelerator downgrades to cpu.
pub fn resolve_profile(choice: &HardwareChoice, available: &[String]) -> HardwareResolution {
    let requested = choice.to_string();
    match choice {
        HardwareChoice::Auto => {
            let profile = detect_profile(available);
            info!(%profile, "Auto-detected hardware profile");
            HardwareResolution {
                requested,
                profile,
                downgraded: false,
            }
        }
        HardwareChoice::Explicit(HardwareProfile::Cpu) => HardwareResolution {
            requested,
            profile: HardwareProfile::Cpu,
            downgraded: false,
        },
        HardwareChoice::Explicit(profile) if offers(available, *profile) => HardwareResolution {
            requested,
            profile: *profile,
            downgraded: false,
        },
        HardwareChoice::Explicit(_) | HardwareChoice::Unknown(_) => {
            let reason = ProbeError::AcceleratorUnavailable {
                requested: requested.clone(),
            };
            warn!("{}; falling back to CPU", reason);
            HardwareResolution {
                requested,
                profile: HardwareProfile::Cpu,
                downgraded: true,
            }
        }
    }
}

fn offers(available: &[String], profile: HardwareProfile) -> bool {
    match profile.accelerator_name() {
        Some(name) => available.iter().any(|a| a == name),
        None => true,
    }
}
