//! Clip builder

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::compose::Clip;
use crate::domain::model::Segment;
use crate::engine::{run_to_completion, CancelToken};
use crate::graph::{format_seconds, Filter, FilterGraph, MediaInput};
use crate::ports::MediaEngine;

/// Canonical output frame and stream layout every clip is conformed to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipFraming {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub sample_rate: u32,
}

impl Default for ClipFraming {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30.0,
            sample_rate: 48000,
        }
    }
}

impl ClipFraming {
    /// Fit inside the frame keeping aspect ratio
    fn scale(&self) -> Filter {
        Filter::new("scale")
            .arg(self.width)
            .arg(self.height)
            .named("force_original_aspect_ratio", "decrease")
    }

    /// Letterbox symmetrically to the exact frame size
    fn pad(&self) -> Filter {
        Filter::new("pad")
            .arg(self.width)
            .arg(self.height)
            .arg("(ow-iw)/2")
            .arg("(oh-ih)/2")
    }
}

/// Turns segments and still images into [`Clip`]s
#[derive(Debug, Clone, Copy)]
pub struct ClipBuilder {
    framing: ClipFraming,
}

impl ClipBuilder {
    pub fn new(framing: ClipFraming) -> Self {
        Self { framing }
    }

    /// Trim `source` to `segment`, reset timestamps to zero and conform the
    /// streams to the canonical frame, rate and layout
    pub fn segment(&self, graph: &mut FilterGraph, source: &Path, segment: Segment) -> Clip {
        let input = graph.add_input(MediaInput::file(source).range(segment.start, segment.end));
        let framing = &self.framing;

        let video = graph.video(graph.video_of(input), Filter::new("setpts").arg("PTS-STARTPTS"));
        let video = graph.video(video, Filter::new("fps").named("fps", format_seconds(framing.fps)));
        let video = graph.video(video, framing.scale());
        let video = graph.video(video, framing.pad());
        let video = graph.video(video, Filter::new("setsar").arg(1));
        let video = graph.video(video, Filter::new("format").arg("yuv420p"));

        let audio = graph.audio(graph.audio_of(input), Filter::new("asetpts").arg("PTS-STARTPTS"));
        let audio = graph.audio(
            audio,
            Filter::new("aformat")
                .named("sample_rates", framing.sample_rate)
                .named("channel_layouts", "stereo"),
        );

        debug!(
            source = %source.display(),
            start = segment.start,
            end = segment.end,
            "Built segment clip"
        );
        Clip {
            video,
            audio,
            duration: segment.duration(),
        }
    }

    /// Engine arguments that render `image` as a silent clip of `duration`
    pub fn still_args(&self, image: &Path, duration: f64, output: &Path) -> Vec<String> {
        let framing = &self.framing;
        vec![
            "-hide_banner".to_string(),
            "-y".to_string(),
            "-loop".to_string(),
            "1".to_string(),
            "-i".to_string(),
            image.to_string_lossy().into_owned(),
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!(
                "anullsrc=channel_layout=stereo:sample_rate={}",
                framing.sample_rate
            ),
            "-t".to_string(),
            format_seconds(duration),
            "-vf".to_string(),
            format!("{},{}", framing.scale(), framing.pad()),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            output.to_string_lossy().into_owned(),
        ]
    }

    /// Synthesize a still-image clip into `scratch_dir` and feed it back
    /// through [`ClipBuilder::segment`]. Any failure yields `None`; callers
    /// treat that as "no intro".
    pub async fn still(
        &self,
        graph: &mut FilterGraph,
        engine: &dyn MediaEngine,
        cancel: &CancelToken,
        image: &Path,
        duration: f64,
        scratch_dir: &Path,
    ) -> Option<Clip> {
        let output: PathBuf = scratch_dir.join("still_intro.mp4");
        let mut command = engine.ffmpeg();
        command.args(self.still_args(image, duration, &output));

        match run_to_completion(command, cancel).await {
            Ok(result) if result.success && output.is_file() => {
                info!(image = %image.display(), duration, "Still image clip synthesized");
                Some(self.segment(graph, &output, Segment { start: 0.0, end: duration }))
            }
            Ok(result) => {
                warn!(
                    image = %image.display(),
                    status = %result.status,
                    "Still image synthesis failed, continuing without intro"
                );
                None
            }
            Err(e) => {
                warn!(image = %image.display(), "Still image synthesis failed, continuing without intro: {}", e);
                None
            }
        }
    }
}
