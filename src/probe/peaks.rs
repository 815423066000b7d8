//! Waveform peaks for the trimming UI.
//!
//! The source audio is reduced to a band-limited 16 kHz mono WAV, `astats`
//! prints a per-frame RMS level, and each level is mapped onto a speech
//! window of -40..-10 dB. Results are cached next to other temp artifacts as
//! `<name>.peaks.json`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::{run_to_completion, stderr_tail, CancelToken};
use crate::error::{ReelcutError, ReelcutResult};
use crate::ports::MediaEngine;

const SPEECH_FLOOR_DB: f64 = -40.0;
const SPEECH_CEILING_DB: f64 = -10.0;
const ANALYSIS_SAMPLE_RATE: u32 = 16000;
const EMPTY_WAVEFORM_LEN: usize = 1000;

/// Cached waveform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakData {
    pub data: Vec<f64>,
    pub length: usize,
    pub bits: u16,
    pub sample_rate: u32,
}

impl PeakData {
    pub fn new(mut data: Vec<f64>) -> Self {
        if data.is_empty() {
            data = vec![0.0; EMPTY_WAVEFORM_LEN];
        }
        Self {
            length: data.len(),
            data,
            bits: 16,
            sample_rate: ANALYSIS_SAMPLE_RATE,
        }
    }
}

/// Map an RMS level in dB onto `[0, 1]`. Anything below the speech floor,
/// including `-inf`, is silence.
pub fn normalize_rms(level_db: f64) -> f64 {
    if level_db.is_nan() || level_db < SPEECH_FLOOR_DB {
        return 0.0;
    }
    ((level_db - SPEECH_FLOOR_DB) / (SPEECH_CEILING_DB - SPEECH_FLOOR_DB)).clamp(0.0, 1.0)
}

/// Normalized levels from every `RMS_level` line in `output`. Unparseable
/// values count as silence.
pub fn parse_rms_levels(output: &str) -> Vec<f64> {
    output
        .lines()
        .filter(|line| line.contains("RMS_level"))
        .map(|line| {
            line.split('=')
                .nth(1)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .map(normalize_rms)
                .unwrap_or(0.0)
        })
        .collect()
}

/// Generates and caches [`PeakData`]
pub struct PeakExtractor<'a> {
    engine: &'a dyn MediaEngine,
    cache_dir: &'a Path,
}

impl<'a> PeakExtractor<'a> {
    pub fn new(engine: &'a dyn MediaEngine, cache_dir: &'a Path) -> Self {
        Self { engine, cache_dir }
    }

    pub fn cache_path(&self, source: &Path) -> PathBuf {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "source".to_string());
        self.cache_dir.join(format!("{}.peaks.json", name))
    }

    fn extract_args(source: &Path, wav: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            source.to_string_lossy().into_owned(),
            "-vn".to_string(),
            "-acodec".to_string(),
            "pcm_s16le".to_string(),
            "-ar".to_string(),
            ANALYSIS_SAMPLE_RATE.to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-af".to_string(),
            "highpass=f=300,lowpass=f=3000,volume=1.0".to_string(),
            wav.to_string_lossy().into_owned(),
        ]
    }

    fn analyze_args(wav: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-i".to_string(),
            wav.to_string_lossy().into_owned(),
            "-filter_complex".to_string(),
            "astats=metadata=1:reset=1,ametadata=mode=print:key=lavfi.astats.Overall.RMS_level"
                .to_string(),
            "-f".to_string(),
            "null".to_string(),
            "-".to_string(),
        ]
    }

    /// Return the cached waveform for `source`, generating it when absent
    /// or unreadable
    pub async fn load_or_generate(&self, source: &Path, cancel: &CancelToken) -> ReelcutResult<PeakData> {
        let cache = self.cache_path(source);
        if let Ok(raw) = fs::read_to_string(&cache) {
            match serde_json::from_str::<PeakData>(&raw) {
                Ok(peaks) => {
                    debug!(cache = %cache.display(), "Using cached peaks");
                    return Ok(peaks);
                }
                Err(e) => warn!(cache = %cache.display(), "Ignoring unreadable peaks cache: {}", e),
            }
        }
        self.generate(source, cancel).await
    }

    /// Extract, analyse and cache. The scratch WAV is removed on every path.
    pub async fn generate(&self, source: &Path, cancel: &CancelToken) -> ReelcutResult<PeakData> {
        if !source.is_file() {
            return Err(ReelcutError::InputFileNotFound {
                path: source.to_string_lossy().into_owned(),
            });
        }
        fs::create_dir_all(self.cache_dir)?;

        let wav = tempfile::Builder::new()
            .prefix("peaks-")
            .suffix(".wav")
            .tempfile_in(self.cache_dir)?
            .into_temp_path();

        let mut extract = self.engine.ffmpeg();
        extract.args(Self::extract_args(source, &wav));
        let extracted = run_to_completion(extract, cancel).await?;
        if !extracted.success {
            return Err(ReelcutError::TranscodeFailed {
                status: extracted.status,
                stderr_tail: stderr_tail(&extracted.stderr, 12),
            });
        }

        let mut analyze = self.engine.ffmpeg();
        analyze.args(Self::analyze_args(&wav));
        let analyzed = run_to_completion(analyze, cancel).await?;
        if !analyzed.success {
            warn!(status = %analyzed.status, "Peak analysis failed, waveform will be empty");
        }

        let peaks = PeakData::new(parse_rms_levels(&analyzed.stderr));
        let cache = self.cache_path(source);
        fs::write(&cache, serde_json::to_vec(&peaks)?)?;
        info!(cache = %cache.display(), length = peaks.length, "Peaks cached");

        if let Err(e) = wav.close() {
            debug!("Failed to remove peaks scratch file: {}", e);
        }
        Ok(peaks)
    }
}
