// TOML config adapter - layered settings (CLI > env > file > defaults)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compose::ClipFraming;
use crate::engine::LoudnessTarget;
use crate::error::{ReelcutError, ReelcutResult};
use crate::janitor::SweepRule;

/// Config files tried in order when no explicit path is given
pub const SEARCH_PATHS: [&str; 2] = ["reelcut.toml", "config/reelcut.toml"];

/// Engine binaries and default hardware choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub hardware: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            hardware: "auto".to_string(),
        }
    }
}

/// Output framing and timing of a render job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Use the probed source frame rate instead of `fps`
    pub match_source_fps: bool,
    pub sample_rate: u32,
    /// Cross-dissolve length for the audio artifact
    pub audio_transition: f64,
    /// Cross-dissolve length for the video artifact
    pub video_transition: f64,
    pub fade: f64,
    pub still_duration: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30.0,
            match_source_fps: false,
            sample_rate: 48000,
            audio_transition: 1.0,
            video_transition: 0.5,
            fade: 1.0,
            still_duration: 5.0,
        }
    }
}

impl RenderSettings {
    pub fn framing(&self, fps: f64) -> ClipFraming {
        ClipFraming {
            width: self.width,
            height: self.height,
            fps,
            sample_rate: self.sample_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub uploads_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub temp_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            processed_dir: PathBuf::from("processed"),
            temp_dir: PathBuf::from("temp"),
        }
    }
}

/// Upper bound for janitor ages and interval, about a century
pub const MAX_JANITOR_HOURS: u64 = 876_000;

fn hours(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(3600))
}

/// Cache eviction ages in hours; `None` disables a directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JanitorSettings {
    pub uploads_max_age_hours: Option<u64>,
    pub temp_max_age_hours: Option<u64>,
    pub interval_hours: u64,
}

impl Default for JanitorSettings {
    fn default() -> Self {
        Self {
            uploads_max_age_hours: Some(2190),
            temp_max_age_hours: Some(24),
            interval_hours: 24,
        }
    }
}

impl JanitorSettings {
    pub fn interval(&self) -> Duration {
        hours(self.interval_hours.max(1))
    }

    pub fn rules(&self, storage: &StorageSettings) -> Vec<SweepRule> {
        let mut rules = Vec::new();
        if let Some(age) = self.uploads_max_age_hours {
            rules.push(SweepRule {
                label: "upload".to_string(),
                dir: storage.uploads_dir.clone(),
                max_age: hours(age),
                keep_peaks_cache: false,
                staging_only: false,
            });
        }
        if let Some(age) = self.temp_max_age_hours {
            rules.push(SweepRule {
                label: "temp".to_string(),
                dir: storage.temp_dir.clone(),
                max_age: hours(age),
                keep_peaks_cache: true,
                staging_only: false,
            });
            // renders interrupted mid-write leave staged outputs here
            rules.push(SweepRule {
                label: "staging".to_string(),
                dir: storage.processed_dir.clone(),
                max_age: hours(age),
                keep_peaks_cache: false,
                staging_only: true,
            });
        }
        rules
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    pub max_concurrent_jobs: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 1,
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineSettings,
    pub render: RenderSettings,
    pub loudness: LoudnessTarget,
    pub storage: StorageSettings,
    pub janitor: JanitorSettings,
    pub jobs: JobSettings,
}

impl Settings {
    /// Reject values no render could succeed with
    pub fn validate(&self) -> ReelcutResult<()> {
        let render = &self.render;
        if render.width == 0 || render.height == 0 {
            return Err(config_error("render.width and render.height must be positive"));
        }
        if !(render.fps > 0.0) {
            return Err(config_error("render.fps must be positive"));
        }
        if render.sample_rate == 0 {
            return Err(config_error("render.sample_rate must be positive"));
        }
        for (name, value) in [
            ("render.audio_transition", render.audio_transition),
            ("render.video_transition", render.video_transition),
            ("render.fade", render.fade),
        ] {
            if !(value >= 0.0) {
                return Err(config_error(format!("{} must not be negative", name)));
            }
        }
        if !(render.still_duration > 0.0) {
            return Err(config_error("render.still_duration must be positive"));
        }
        if self.jobs.max_concurrent_jobs == 0 {
            return Err(config_error("jobs.max_concurrent_jobs must be at least 1"));
        }
        let janitor = &self.janitor;
        for (name, value) in [
            ("janitor.uploads_max_age_hours", janitor.uploads_max_age_hours),
            ("janitor.temp_max_age_hours", janitor.temp_max_age_hours),
            ("janitor.interval_hours", Some(janitor.interval_hours)),
        ] {
            if value.is_some_and(|h| h > MAX_JANITOR_HOURS) {
                return Err(config_error(format!(
                    "{} must be at most {}",
                    name, MAX_JANITOR_HOURS
                )));
            }
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> ReelcutError {
    ReelcutError::Config {
        message: message.into(),
    }
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse settings from TOML text; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> ReelcutResult<Settings> {
        toml::from_str(content).map_err(|e| config_error(format!("Failed to parse TOML config: {}", e)))
    }

    pub fn to_toml_string(settings: &Settings) -> ReelcutResult<String> {
        toml::to_string_pretty(settings)
            .map_err(|e| config_error(format!("Failed to serialize config: {}", e)))
    }

    /// Load settings: the explicit file (which must exist) or the first
    /// file found on [`SEARCH_PATHS`], then environment overrides
    pub fn load(explicit: Option<&Path>) -> ReelcutResult<Settings> {
        let mut settings = match explicit {
            Some(path) => Self::load_file(path)?,
            None => match SEARCH_PATHS.iter().map(Path::new).find(|p| p.is_file()) {
                Some(path) => Self::load_file(path)?,
                None => {
                    debug!("No config file found, using defaults");
                    Settings::default()
                }
            },
        };
        Self::apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    fn load_file(path: &Path) -> ReelcutResult<Settings> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            config_error(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        info!("Loading configuration from: {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Apply `REELCUT_*` overrides through `lookup`
    pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;
        let mut take = |key: &str| {
            let value = lookup(key).filter(|v| !v.trim().is_empty());
            if value.is_some() {
                debug!("Found environment override: {}", key);
                applied += 1;
            }
            value
        };

        if let Some(v) = take("REELCUT_FFMPEG") {
            settings.engine.ffmpeg = v;
        }
        if let Some(v) = take("REELCUT_FFPROBE") {
            settings.engine.ffprobe = v;
        }
        if let Some(v) = take("REELCUT_HARDWARE") {
            settings.engine.hardware = v;
        }
        if let Some(v) = take("REELCUT_TEMP_DIR") {
            settings.storage.temp_dir = PathBuf::from(v);
        }
        if let Some(v) = take("REELCUT_PROCESSED_DIR") {
            settings.storage.processed_dir = PathBuf::from(v);
        }
        if let Some(v) = take("REELCUT_UPLOADS_DIR") {
            settings.storage.uploads_dir = PathBuf::from(v);
        }

        if applied > 0 {
            info!("Applied {} environment variable overrides", applied);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_reference_pipeline() {
        let settings = Settings::default();
        assert_eq!(settings.render.width, 1920);
        assert_eq!(settings.render.height, 1080);
        assert_eq!(settings.render.fps, 30.0);
        assert_eq!(settings.render.audio_transition, 1.0);
        assert_eq!(settings.render.video_transition, 0.5);
        assert_eq!(settings.render.still_duration, 5.0);
        assert_eq!(settings.loudness, LoudnessTarget::default());
        assert_eq!(settings.janitor.uploads_max_age_hours, Some(2190));
        assert_eq!(settings.jobs.max_concurrent_jobs, 1);
        settings.validate().unwrap();
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = TomlConfigAdapter::from_toml_str(
            r#"
[engine]
hardware = "cuda"

[render]
fps = 25.0
match_source_fps = true

[loudness]
integrated = -16.0

[janitor]
uploads_max_age_hours = 48
"#,
        )
        .unwrap();
        assert_eq!(settings.engine.hardware, "cuda");
        assert_eq!(settings.engine.ffmpeg, "ffmpeg");
        assert_eq!(settings.render.fps, 25.0);
        assert!(settings.render.match_source_fps);
        assert_eq!(settings.render.width, 1920);
        assert_eq!(settings.loudness.integrated, -16.0);
        assert_eq!(settings.loudness.range, 7.0);
        assert_eq!(settings.janitor.uploads_max_age_hours, Some(48));
        assert_eq!(settings.janitor.temp_max_age_hours, Some(24));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfigAdapter::from_toml_str("[render\nfps = ").unwrap_err();
        assert!(matches!(err, ReelcutError::Config { .. }));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let settings = Settings::default();
        let text = TomlConfigAdapter::to_toml_string(&settings).unwrap();
        assert_eq!(TomlConfigAdapter::from_toml_str(&text).unwrap(), settings);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("REELCUT_FFMPEG", "/opt/ffmpeg/bin/ffmpeg"),
            ("REELCUT_HARDWARE", "intel"),
            ("REELCUT_TEMP_DIR", "/var/tmp/reelcut"),
            ("REELCUT_PROCESSED_DIR", "  "),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        TomlConfigAdapter::apply_env_overrides(&mut settings, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.engine.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(settings.engine.ffprobe, "ffprobe");
        assert_eq!(settings.engine.hardware, "intel");
        assert_eq!(settings.storage.temp_dir, PathBuf::from("/var/tmp/reelcut"));
        assert_eq!(settings.storage.processed_dir, PathBuf::from("processed"));
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        settings.jobs.max_concurrent_jobs = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.render.fade = -1.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_janitor_rules() {
        let mut janitor = JanitorSettings::default();
        let storage = StorageSettings::default();
        let rules = janitor.rules(&storage);
        assert_eq!(rules.len(), 3);
        assert!(!rules[0].keep_peaks_cache);
        assert!(rules[1].keep_peaks_cache);
        assert_eq!(rules[1].max_age, Duration::from_secs(24 * 3600));
        assert!(rules[2].staging_only);
        assert_eq!(rules[2].dir, storage.processed_dir);
        assert_eq!(rules[2].max_age, rules[1].max_age);

        janitor.uploads_max_age_hours = None;
        assert_eq!(janitor.rules(&storage).len(), 2);

        janitor.temp_max_age_hours = None;
        assert!(janitor.rules(&storage).is_empty());
    }

    #[test]
    fn test_huge_janitor_hours_saturate_and_fail_validation() {
        let janitor = JanitorSettings {
            uploads_max_age_hours: Some(u64::MAX),
            temp_max_age_hours: Some(u64::MAX / 2),
            interval_hours: u64::MAX,
        };
        let rules = janitor.rules(&StorageSettings::default());
        assert_eq!(rules[0].max_age, Duration::from_secs(u64::MAX));
        assert_eq!(janitor.interval(), Duration::from_secs(u64::MAX));

        let settings = Settings {
            janitor,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(ReelcutError::Config { .. })));

        let mut settings = Settings::default();
        settings.janitor.interval_hours = MAX_JANITOR_HOURS;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let err = TomlConfigAdapter::load(Some(Path::new("/nonexistent/reelcut.toml"))).unwrap_err();
        assert!(matches!(err, ReelcutError::Config { .. }));
    }
}
