// Render interactor - orchestrates the audio and video render job

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::adapters::Settings;
use crate::app::hardware_interactor::HardwareInteractor;
use crate::app::job_gate::JobGate;
use crate::compose::{Clip, ClipBuilder, EnvelopeApplier, Timeline, TransitionCompositor};
use crate::domain::model::{HardwareProfile, RenderReport, RenderRequest, Segment};
use crate::engine::{
    CancelToken, EngineJob, LoudnessNormalizer, ProgressReporter, TranscodeSupervisor,
};
use crate::error::{ReelcutError, ReelcutResult};
use crate::graph::{Filter, FilterGraph, OutputPad};
use crate::janitor::{JOB_SCRATCH_PREFIX, STAGING_PREFIX};
use crate::planner::SegmentPlanner;
use crate::ports::{MediaEngine, StreamProbe};
use crate::probe::frame_rate_or_default;

/// `<dir>/clipped_<filename>` and `<dir>/<stem>.mp3`
pub fn artifact_paths(source: &Path, output_dir: &Path) -> ReelcutResult<(PathBuf, PathBuf)> {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ReelcutError::invalid(format!("No file name in {}", source.display())))?;
    let stem = source
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.clone());

    Ok((
        output_dir.join(format!("clipped_{}", file_name)),
        output_dir.join(format!("{}.mp3", stem)),
    ))
}

/// Staged files are created owner-only; artifacts get `rw-r--r--`
#[cfg(unix)]
fn publish_mode(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn publish_mode(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Interactor for the render use case
pub struct RenderInteractor {
    engine: Arc<dyn MediaEngine>,
    stream_probe: Arc<dyn StreamProbe>,
    hardware: Arc<HardwareInteractor>,
    settings: Arc<Settings>,
    gate: JobGate,
}

impl RenderInteractor {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        stream_probe: Arc<dyn StreamProbe>,
        hardware: Arc<HardwareInteractor>,
        settings: Arc<Settings>,
    ) -> Self {
        let gate = JobGate::new(settings.jobs.max_concurrent_jobs);
        Self {
            engine,
            stream_probe,
            hardware,
            settings,
            gate,
        }
    }

    pub fn gate(&self) -> &JobGate {
        &self.gate
    }

    /// Render the audio-only and the video artifact for `request`.
    /// Progress is published on `reporter`; `cancel` aborts the running
    /// engine process and discards partial output.
    pub async fn execute(
        &self,
        request: &RenderRequest,
        reporter: &ProgressReporter,
        cancel: &CancelToken,
    ) -> ReelcutResult<RenderReport> {
        let _permit = self.gate.try_admit()?;

        if !request.source.is_file() {
            return Err(ReelcutError::InputFileNotFound {
                path: request.source.to_string_lossy().into_owned(),
            });
        }
        let segments =
            SegmentPlanner::new().plan(request.start_time, request.end_time, &request.cuts)?;
        let (video_path, audio_path) = artifact_paths(&request.source, &request.output_dir)?;

        let hardware = self.hardware.resolve(&request.hardware).await;
        info!(
            requested = %hardware.requested,
            resolved = %hardware.profile,
            encoder = hardware.profile.video_encoder(),
            "Hardware resolved"
        );

        let render = &self.settings.render;
        let fps = if render.match_source_fps {
            frame_rate_or_default(self.stream_probe.as_ref(), &request.source).await
        } else {
            render.fps
        };

        fs::create_dir_all(&request.output_dir)?;
        fs::create_dir_all(&self.settings.storage.temp_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix(JOB_SCRATCH_PREFIX)
            .tempdir_in(&self.settings.storage.temp_dir)?;

        let job = RenderJob {
            engine: self.engine.as_ref(),
            settings: &self.settings,
            builder: ClipBuilder::new(render.framing(fps)),
            supervisor: TranscodeSupervisor::new(self.engine.as_ref(), reporter, cancel),
            cancel,
            segments: &segments,
            source: &request.source,
            scratch: scratch.path(),
        };

        let audio_duration = job.audio_artifact(&audio_path).await?;
        let (video_duration, intro) = job
            .video_artifact(&video_path, request.still_image.as_deref(), hardware.profile)
            .await?;

        if let Err(e) = scratch.close() {
            warn!("Failed to remove job scratch directory: {}", e);
        }
        info!(
            video = %video_path.display(),
            audio = %audio_path.display(),
            "Render job completed"
        );

        Ok(RenderReport {
            hardware,
            video_path,
            audio_path,
            audio_duration,
            video_duration,
            intro,
            progress: reporter.snapshot(),
        })
    }
}

/// Everything one admitted job shares between its two artifacts
struct RenderJob<'a> {
    engine: &'a dyn MediaEngine,
    settings: &'a Settings,
    builder: ClipBuilder,
    supervisor: TranscodeSupervisor<'a>,
    cancel: &'a CancelToken,
    segments: &'a [Segment],
    source: &'a Path,
    scratch: &'a Path,
}

impl RenderJob<'_> {
    /// Intro (if any) followed by every planned segment, folded and faded
    fn timeline(
        &self,
        graph: &mut FilterGraph,
        intro: Option<Clip>,
        transition: f64,
    ) -> ReelcutResult<Timeline> {
        let clips: Vec<_> = intro
            .into_iter()
            .chain(self.segments.iter().map(|s| self.builder.segment(graph, self.source, *s)))
            .collect();
        let timeline = TransitionCompositor::new(transition).compose(graph, clips)?;
        Ok(EnvelopeApplier::new(self.settings.render.fade).apply(graph, timeline))
    }

    /// Returns the audio timeline duration
    async fn audio_artifact(&self, output: &Path) -> ReelcutResult<f64> {
        let mut graph = FilterGraph::new();
        let timeline = self.timeline(&mut graph, None, self.settings.render.audio_transition)?;

        let normalizer = LoudnessNormalizer::new(&self.supervisor, self.settings.loudness);
        let audio = normalizer
            .normalize(&mut graph, timeline.audio, timeline.duration, self.scratch)
            .await?;

        let mut args = graph.render(&[OutputPad::Audio(audio)])?.to_args();
        args.extend(["-c:a".to_string(), "libmp3lame".to_string()]);
        self.write(args, output, timeline.duration, "Processing audio...").await?;
        Ok(timeline.duration)
    }

    /// Returns the video timeline duration and whether an intro was used
    async fn video_artifact(
        &self,
        output: &Path,
        still_image: Option<&Path>,
        profile: HardwareProfile,
    ) -> ReelcutResult<(f64, bool)> {
        let mut graph = FilterGraph::new();
        let intro = match still_image {
            Some(image) => {
                self.builder
                    .still(
                        &mut graph,
                        self.engine,
                        self.cancel,
                        image,
                        self.settings.render.still_duration,
                        self.scratch,
                    )
                    .await
            }
            None => None,
        };
        if self.cancel.is_cancelled() {
            return Err(ReelcutError::Cancelled);
        }
        let has_intro = intro.is_some();
        let timeline = self.timeline(&mut graph, intro, self.settings.render.video_transition)?;

        let normalizer = LoudnessNormalizer::new(&self.supervisor, self.settings.loudness);
        let audio = normalizer
            .normalize(&mut graph, timeline.audio, timeline.duration, self.scratch)
            .await?;

        let mut video = timeline.video;
        if profile.needs_hw_upload() {
            video = graph.video(video, Filter::new("format").arg("nv12"));
            video = graph.video(video, Filter::new("hwupload"));
        }

        let mut args = profile.global_flags();
        args.extend(graph.render(&[OutputPad::Video(video), OutputPad::Audio(audio)])?.to_args());
        args.extend([
            "-c:v".to_string(),
            profile.video_encoder().to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
        ]);
        self.write(args, output, timeline.duration, "Processing video...").await?;
        Ok((timeline.duration, has_intro))
    }

    /// Encode into a hidden sibling of `output` and move it into place only
    /// when the engine succeeds
    async fn write(
        &self,
        mut args: Vec<String>,
        output: &Path,
        duration: f64,
        label: &str,
    ) -> ReelcutResult<()> {
        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let suffix = output
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(&suffix)
            .tempfile_in(dir)?
            .into_temp_path();

        args.push(staged.to_string_lossy().into_owned());
        self.supervisor
            .run(&EngineJob {
                args,
                duration_seconds: duration,
                label: label.to_string(),
            })
            .await?;

        publish_mode(&staged)?;
        staged.persist(output).map_err(|e| ReelcutError::Io(e.error))?;
        info!(output = %output.display(), duration, "Artifact written");
        Ok(())
    }
}
