//! Two-pass loudness normalization.
//!
//! Pass one runs `loudnorm` in measurement mode into a scratch WAV and reads
//! the JSON report the filter prints to stderr. Pass two is a filter node
//! appended to the caller's graph that applies linear correction using the
//! measured values.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::engine::supervisor::{EngineJob, TranscodeSupervisor};
use crate::error::{ReelcutError, ReelcutResult};
use crate::graph::{AudioNode, Filter, FilterGraph, OutputPad};

/// Loudness targets shared by both passes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoudnessTarget {
    /// Integrated loudness in LUFS
    pub integrated: f64,
    /// Loudness range in LU
    pub range: f64,
    /// True-peak ceiling in dBTP
    pub true_peak: f64,
}

impl Default for LoudnessTarget {
    fn default() -> Self {
        Self {
            integrated: -23.0,
            range: 7.0,
            true_peak: -2.0,
        }
    }
}

/// Values reported by the measurement pass
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LoudnessMeasurement {
    #[serde(deserialize_with = "number_or_string")]
    pub input_i: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub input_lra: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub input_tp: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub input_thresh: f64,
}

// loudnorm quotes its numbers; accept both forms
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

/// Extract the measurement from the engine's stderr. The report is the last
/// JSON object in the output.
pub fn parse_measurement(stderr: &str) -> ReelcutResult<LoudnessMeasurement> {
    let start = stderr.rfind('{').ok_or_else(|| ReelcutError::NormalizationFailed {
        message: "no loudness report in engine output".to_string(),
    })?;

    let measurement = serde_json::Deserializer::from_str(&stderr[start..])
        .into_iter::<LoudnessMeasurement>()
        .next()
        .ok_or_else(|| ReelcutError::NormalizationFailed {
            message: "empty loudness report".to_string(),
        })?
        .map_err(|e| ReelcutError::NormalizationFailed {
            message: format!("malformed loudness report: {}", e),
        })?;

    // silence measures as -inf, which the correction pass rejects
    let values = [
        measurement.input_i,
        measurement.input_lra,
        measurement.input_tp,
        measurement.input_thresh,
    ];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ReelcutError::NormalizationFailed {
            message: format!("loudness report has non-finite values: {:?}", measurement),
        });
    }

    Ok(measurement)
}

/// `loudnorm` in measurement mode
pub fn measure_filter(target: &LoudnessTarget) -> Filter {
    Filter::new("loudnorm")
        .named("I", target.integrated)
        .named("LRA", target.range)
        .named("TP", target.true_peak)
        .named("print_format", "json")
}

/// `loudnorm` in linear correction mode, fed with pass-one values
pub fn correction_filter(target: &LoudnessTarget, measured: &LoudnessMeasurement) -> Filter {
    Filter::new("loudnorm")
        .named("I", target.integrated)
        .named("LRA", target.range)
        .named("TP", target.true_peak)
        .named("measured_I", measured.input_i)
        .named("measured_LRA", measured.input_lra)
        .named("measured_TP", measured.input_tp)
        .named("measured_thresh", measured.input_thresh)
        .named("linear", "true")
        .named("print_format", "json")
}

/// Runs the measurement pass and builds the correction node
pub struct LoudnessNormalizer<'s, 'a> {
    supervisor: &'s TranscodeSupervisor<'a>,
    target: LoudnessTarget,
}

impl<'s, 'a> LoudnessNormalizer<'s, 'a> {
    pub fn new(supervisor: &'s TranscodeSupervisor<'a>, target: LoudnessTarget) -> Self {
        Self { supervisor, target }
    }

    /// Measure the loudness of `audio`. The scratch WAV lives in
    /// `scratch_dir` and is removed on every return path.
    pub async fn measure(
        &self,
        graph: &FilterGraph,
        audio: AudioNode,
        duration: f64,
        scratch_dir: &Path,
    ) -> ReelcutResult<LoudnessMeasurement> {
        let mut measuring = graph.clone();
        let measured = measuring.audio(audio, measure_filter(&self.target));
        let rendered = measuring.render(&[OutputPad::Audio(measured)])?;

        let scratch = tempfile::Builder::new()
            .prefix("loudnorm-")
            .suffix(".wav")
            .tempfile_in(scratch_dir)?
            .into_temp_path();

        let mut args = rendered.to_args();
        args.extend(["-c:a".to_string(), "pcm_s16le".to_string()]);
        args.push(scratch.to_string_lossy().into_owned());

        let output = self
            .supervisor
            .run(&EngineJob {
                args,
                duration_seconds: duration,
                label: "Normalizing audio...".to_string(),
            })
            .await
            .map_err(|e| match e {
                ReelcutError::TranscodeFailed { status, stderr_tail } => {
                    ReelcutError::NormalizationFailed {
                        message: format!(
                            "measurement pass exited with {}: {}",
                            status, stderr_tail
                        ),
                    }
                }
                other => other,
            })?;

        let measurement = parse_measurement(&output.stderr)?;
        info!(
            input_i = measurement.input_i,
            input_lra = measurement.input_lra,
            input_tp = measurement.input_tp,
            input_thresh = measurement.input_thresh,
            "Loudness measured"
        );
        if let Err(e) = scratch.close() {
            debug!("Failed to remove measurement scratch file: {}", e);
        }
        Ok(measurement)
    }

    /// Measure `audio`, then append the correction node to `graph`
    pub async fn normalize(
        &self,
        graph: &mut FilterGraph,
        audio: AudioNode,
        duration: f64,
        scratch_dir: &Path,
    ) -> ReelcutResult<AudioNode> {
        let measurement = self.measure(graph, audio, duration, scratch_dir).await?;
        Ok(graph.audio(audio, correction_filter(&self.target, &measurement)))
    }
}
