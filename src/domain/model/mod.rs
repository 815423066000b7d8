// Domain models - Core types and data structures

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ReelcutError, ReelcutResult};


/// Time specification - represents time in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }

    /// Parse time string in various formats
    pub fn parse(time_str: &str) -> ReelcutResult<Self> {
        let trimmed = time_str.trim();

        // Try parsing as seconds (float)
        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(ReelcutError::invalid(format!(
                    "Time must be a non-negative number: {}",
                    trimmed
                )));
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        let bad = |what: &str| ReelcutError::invalid(format!("Invalid {} in '{}'", what, trimmed));
        match parts.as_slice() {
            [minutes, seconds] => {
                let minutes = minutes.parse::<u32>().map_err(|_| bad("minutes"))?;
                let seconds = seconds.parse::<f64>().map_err(|_| bad("seconds"))?;
                if !(0.0..60.0).contains(&seconds) {
                    return Err(bad("seconds"));
                }
                Ok(Self::from_seconds(minutes as f64 * 60.0 + seconds))
            }
            [hours, minutes, seconds] => {
                let hours = hours.parse::<u32>().map_err(|_| bad("hours"))?;
                let minutes = minutes.parse::<u32>().map_err(|_| bad("minutes"))?;
                let seconds = seconds.parse::<f64>().map_err(|_| bad("seconds"))?;
                if minutes >= 60 {
                    return Err(bad("minutes"));
                }
                if !(0.0..60.0).contains(&seconds) {
                    return Err(bad("seconds"));
                }
                Ok(Self::from_seconds(
                    hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
                ))
            }
            _ => Err(ReelcutError::invalid(
                "Invalid time format. Supported formats: seconds (e.g., 123.45), MM:SS.ms (e.g., 2:30.5), HH:MM:SS.ms (e.g., 1:02:30.5)",
            )),
        }
    }

    /// Format as HH:MM:SS.ms
    pub fn format_hms(&self) -> String {
        let total_ms = (self.seconds * 1000.0).round() as u64;
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let seconds = (total_ms % 60_000) / 1000;
        let milliseconds = total_ms % 1000;

        if hours > 0 {
            format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
        } else {
            format!("{}:{:02}.{:03}", minutes, seconds, milliseconds)
        }
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

/// Caller-supplied cut intervals. `clip_start[i]..clip_end[i]` is removed
/// from the output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentBounds {
    pub clip_start: Vec<f64>,
    pub clip_end: Vec<f64>,
}

impl SegmentBounds {
    pub fn new(clip_start: Vec<f64>, clip_end: Vec<f64>) -> Self {
        Self {
            clip_start,
            clip_end,
        }
    }

    /// Cut lists are only honoured when both are present and the same length
    pub fn is_usable(&self) -> bool {
        !self.clip_start.is_empty() && self.clip_start.len() == self.clip_end.len()
    }
}

/// One contiguous range of the source kept in the output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Concrete acceleration backend used for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareProfile {
    Cpu,
    Cuda,
    IntelQsv,
    AppleVideoToolbox,
    Vaapi,
}

impl HardwareProfile {
    /// Auto-detection priority, best first
    pub const PRIORITY: [HardwareProfile; 4] = [
        HardwareProfile::Cuda,
        HardwareProfile::IntelQsv,
        HardwareProfile::AppleVideoToolbox,
        HardwareProfile::Vaapi,
    ];

    /// Name the engine reports in its `-hwaccels` list
    pub fn accelerator_name(&self) -> Option<&'static str> {
        match self {
            HardwareProfile::Cpu => None,
            HardwareProfile::Cuda => Some("cuda"),
            HardwareProfile::IntelQsv => Some("qsv"),
            HardwareProfile::AppleVideoToolbox => Some("videotoolbox"),
            HardwareProfile::Vaapi => Some("vaapi"),
        }
    }

    /// Video encoder identifier
    pub fn video_encoder(&self) -> &'static str {
        match self {
            HardwareProfile::Cpu => "libx264",
            HardwareProfile::Cuda => "h264_nvenc",
            HardwareProfile::IntelQsv => "h264_qsv",
            HardwareProfile::AppleVideoToolbox => "h264_videotoolbox",
            HardwareProfile::Vaapi => "h264_vaapi",
        }
    }

    /// Global engine flags placed before the inputs
    pub fn global_flags(&self) -> Vec<String> {
        let flags: &[&str] = match self {
            HardwareProfile::Cpu => &[],
            HardwareProfile::Cuda => &["-hwaccel", "cuda"],
            HardwareProfile::IntelQsv => &["-hwaccel", "qsv"],
            HardwareProfile::AppleVideoToolbox => &["-hwaccel", "videotoolbox"],
            HardwareProfile::Vaapi => &["-vaapi_device", "/dev/dri/renderD128"],
        };
        flags.iter().map(|s| s.to_string()).collect()
    }

    /// VAAPI encoders only accept frames uploaded to the device
    pub fn needs_hw_upload(&self) -> bool {
        matches!(self, HardwareProfile::Vaapi)
    }

    pub fn friendly_name(&self) -> &'static str {
        match self {
            HardwareProfile::Cpu => "CPU (libx264)",
            HardwareProfile::Cuda => "NVIDIA CUDA (NVENC)",
            HardwareProfile::IntelQsv => "Intel Quick Sync (QSV)",
            HardwareProfile::AppleVideoToolbox => "Apple VideoToolbox",
            HardwareProfile::Vaapi => "VAAPI",
        }
    }

    /// Map an engine `-hwaccels` entry back to a profile
    pub fn from_accelerator_name(name: &str) -> Option<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|p| p.accelerator_name() == Some(name))
    }
}

impl fmt::Display for HardwareProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HardwareProfile::Cpu => "cpu",
            HardwareProfile::Cuda => "cuda",
            HardwareProfile::IntelQsv => "intel",
            HardwareProfile::AppleVideoToolbox => "apple",
            HardwareProfile::Vaapi => "vaapi",
        };
        f.write_str(name)
    }
}

/// The user's accelerator request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareChoice {
    Auto,
    Explicit(HardwareProfile),
    /// A name no profile answers to; always resolves to cpu
    Unknown(String),
}

impl FromStr for HardwareChoice {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let choice = match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => HardwareChoice::Auto,
            "cpu" => HardwareChoice::Explicit(HardwareProfile::Cpu),
            "cuda" | "nvenc" => HardwareChoice::Explicit(HardwareProfile::Cuda),
            "intel" | "qsv" => HardwareChoice::Explicit(HardwareProfile::IntelQsv),
            "apple" | "videotoolbox" => {
                HardwareChoice::Explicit(HardwareProfile::AppleVideoToolbox)
            }
            "vaapi" => HardwareChoice::Explicit(HardwareProfile::Vaapi),
            other => HardwareChoice::Unknown(other.to_string()),
        };
        Ok(choice)
    }
}

impl fmt::Display for HardwareChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareChoice::Auto => f.write_str("auto"),
            HardwareChoice::Explicit(profile) => write!(f, "{}", profile),
            HardwareChoice::Unknown(name) => f.write_str(name),
        }
    }
}

/// Outcome of resolving a [`HardwareChoice`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HardwareResolution {
    pub requested: String,
    pub profile: HardwareProfile,
    /// True when an explicit request was downgraded to cpu
    pub downgraded: bool,
}

/// Live status of one long-running media operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub percent: u8,
    pub message: String,
    pub active: bool,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            percent: 0,
            message: String::new(),
            active: false,
        }
    }
}

impl ProgressState {
    pub fn started(message: impl Into<String>) -> Self {
        Self {
            percent: 0,
            message: message.into(),
            active: true,
        }
    }

    pub fn finished() -> Self {
        Self {
            percent: 100,
            message: String::new(),
            active: false,
        }
    }
}

/// Everything a render job needs from the caller
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub source: PathBuf,
    pub still_image: Option<PathBuf>,
    pub start_time: f64,
    pub end_time: f64,
    pub cuts: SegmentBounds,
    pub hardware: HardwareChoice,
    pub output_dir: PathBuf,
}

/// What a finished render job hands back
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    pub hardware: HardwareResolution,
    pub video_path: PathBuf,
    pub audio_path: PathBuf,
    /// Timeline length of the audio-only artifact
    pub audio_duration: f64,
    /// Timeline length of the video artifact, intro included
    pub video_duration: f64,
    /// Whether a still-image intro made it into the video
    pub intro: bool,
    pub progress: ProgressState,
}
