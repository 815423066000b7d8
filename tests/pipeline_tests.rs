//! End-to-end render jobs against a scripted engine.
//!
//! The scripted engine is `sh -c <script>`: it records its argument list,
//! prints a loudness report on stderr and progress on stdout, and creates
//! whatever media file it was asked to write.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio::process::Command;

use reelcut_cli::adapters::Settings;
use reelcut_cli::engine::{CancelToken, ProgressReporter};
use reelcut_cli::ports::MediaEngine;
use reelcut_cli::*;

const REPORT: &str = r#"{"input_i":"-27.30","input_lra":"5.10","input_tp":"-3.40","input_thresh":"-37.90","output_i":"-23.00","target_offset":"0.00"}"#;

struct ScriptEngine {
    script: String,
}

impl MediaEngine for ScriptEngine {
    fn ffmpeg(&self) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(&self.script);
        command
    }

    fn ffprobe(&self) -> Command {
        self.ffmpeg()
    }
}

/// Workspace with a source file, storage dirs and an argument log
struct Fixture {
    _root: TempDir,
    source: PathBuf,
    image: PathBuf,
    processed: PathBuf,
    temp: PathBuf,
    log: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let source = root.path().join("talk.mp4");
        let image = root.path().join("cover.png");
        fs::write(&source, b"not really a video").unwrap();
        fs::write(&image, b"not really an image").unwrap();
        Self {
            source,
            image,
            processed: root.path().join("processed"),
            temp: root.path().join("temp"),
            log: root.path().join("engine.log"),
            _root: root,
        }
    }

    fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.storage.processed_dir = self.processed.clone();
        settings.storage.temp_dir = self.temp.clone();
        settings.storage.uploads_dir = self.source.parent().unwrap().to_path_buf();
        settings
    }

    /// `on_output` runs with `$last` set to the output path, before the file
    /// is created
    fn engine(&self, on_output: &str) -> Arc<dyn MediaEngine> {
        let script = format!(
            r#"printf '%s\n' "$*" >> '{log}'
for last; do :; done
case "$last" in
  *.mp4|*.mp3|*.wav)
    {on_output}
    printf 'out_time_us=1000000\nprogress=continue\nout_time_us=2000000\nprogress=end\n'
    echo '{report}' >&2
    : > "$last"
    ;;
esac"#,
            log = self.log.display(),
            on_output = on_output,
            report = REPORT,
        );
        Arc::new(ScriptEngine { script })
    }

    fn container(&self, on_output: &str) -> DefaultAppContainer {
        DefaultAppContainer::with_engine(self.settings(), self.engine(on_output))
    }

    fn request(&self, end_time: f64, cuts: SegmentBounds) -> RenderRequest {
        RenderRequest {
            source: self.source.clone(),
            still_image: None,
            start_time: 0.0,
            end_time,
            cuts,
            hardware: HardwareChoice::Explicit(HardwareProfile::Cpu),
            output_dir: self.processed.clone(),
        }
    }

    fn engine_calls(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn entries(dir: &Path) -> Vec<String> {
        match fs::read_dir(dir) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[tokio::test]
async fn test_render_single_cut_produces_both_artifacts() {
    let fixture = Fixture::new();
    let container = fixture.container(":");
    let reporter = ProgressReporter::new();
    let cancel = CancelToken::new();

    let request = fixture.request(30.0, SegmentBounds::new(vec![10.0], vec![20.0]));
    let report = container
        .render_interactor()
        .execute(&request, &reporter, &cancel)
        .await
        .unwrap();

    assert_eq!(report.audio_duration, 19.0);
    assert_eq!(report.video_duration, 19.5);
    assert!(!report.intro);
    assert_eq!(report.hardware.profile, HardwareProfile::Cpu);
    assert_eq!(report.video_path, fixture.processed.join("clipped_talk.mp4"));
    assert_eq!(report.audio_path, fixture.processed.join("talk.mp3"));
    assert!(report.video_path.is_file());
    assert!(report.audio_path.is_file());
    assert!(!report.progress.active);
    assert_eq!(report.progress.percent, 100);

    // staged outputs were moved into place
    let mut outputs = Fixture::entries(&fixture.processed);
    outputs.sort();
    assert_eq!(outputs, vec!["clipped_talk.mp4", "talk.mp3"]);
}

#[tokio::test]
async fn test_artifacts_are_world_readable() {
    use std::os::unix::fs::PermissionsExt;

    let fixture = Fixture::new();
    let container = fixture.container(":");
    let request = fixture.request(30.0, SegmentBounds::new(vec![10.0], vec![20.0]));
    let report = container
        .render_interactor()
        .execute(&request, &ProgressReporter::new(), &CancelToken::new())
        .await
        .unwrap();

    for path in [&report.video_path, &report.audio_path] {
        let mode = fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644, "{}", path.display());
    }
}

#[tokio::test]
async fn test_correction_pass_uses_measured_values() {
    let fixture = Fixture::new();
    let container = fixture.container(":");

    let request = fixture.request(30.0, SegmentBounds::new(vec![10.0], vec![20.0]));
    container
        .render_interactor()
        .execute(&request, &ProgressReporter::new(), &CancelToken::new())
        .await
        .unwrap();

    let calls = fixture.engine_calls();
    let measurements: Vec<_> = calls
        .iter()
        .filter(|c| c.contains("print_format=json") && !c.contains("measured_I"))
        .collect();
    let corrections: Vec<_> = calls.iter().filter(|c| c.contains("measured_I")).collect();

    // one measurement and one correction per artifact
    assert_eq!(measurements.len(), 2);
    assert_eq!(corrections.len(), 2);
    for call in &corrections {
        assert!(call.contains("measured_I=-27.3"));
        assert!(call.contains("measured_LRA=5.1"));
        assert!(call.contains("measured_TP=-3.4"));
        assert!(call.contains("measured_thresh=-37.9"));
        assert!(call.contains("linear=true"));
    }
    assert!(calls.iter().any(|c| c.contains("libmp3lame")));
    assert!(calls.iter().any(|c| c.contains("-c:v libx264")));
    assert!(calls.iter().any(|c| c.contains("acrossfade=d=1")));
    assert!(calls.iter().any(|c| c.contains("xfade=transition=fade:duration=0.5:offset=9.5")));
}

#[tokio::test]
async fn test_still_intro_extends_the_video_timeline() {
    let fixture = Fixture::new();
    let container = fixture.container(":");

    let mut request = fixture.request(10.0, SegmentBounds::default());
    request.still_image = Some(fixture.image.clone());
    let report = container
        .render_interactor()
        .execute(&request, &ProgressReporter::new(), &CancelToken::new())
        .await
        .unwrap();

    assert!(report.intro);
    assert_eq!(report.video_duration, 14.5);
    // the audio artifact never carries the intro
    assert_eq!(report.audio_duration, 10.0);
    assert!(fixture
        .engine_calls()
        .iter()
        .any(|c| c.contains("-loop 1") && c.ends_with("still_intro.mp4")));
}

#[tokio::test]
async fn test_failed_still_is_skipped() {
    let fixture = Fixture::new();
    let container = fixture.container(r#"case "$last" in *still_intro.mp4) exit 1;; esac"#);

    let mut request = fixture.request(10.0, SegmentBounds::default());
    request.still_image = Some(fixture.image.clone());
    let report = container
        .render_interactor()
        .execute(&request, &ProgressReporter::new(), &CancelToken::new())
        .await
        .unwrap();

    assert!(!report.intro);
    assert_eq!(report.video_duration, 10.0);
}

#[tokio::test]
async fn test_job_scratch_is_removed() {
    let fixture = Fixture::new();
    let container = fixture.container(":");

    let mut request = fixture.request(30.0, SegmentBounds::new(vec![10.0], vec![20.0]));
    request.still_image = Some(fixture.image.clone());
    container
        .render_interactor()
        .execute(&request, &ProgressReporter::new(), &CancelToken::new())
        .await
        .unwrap();

    assert!(fixture.temp.is_dir());
    assert!(Fixture::entries(&fixture.temp).is_empty());
}

#[tokio::test]
async fn test_transcode_failure_leaves_no_artifact() {
    let fixture = Fixture::new();
    let container =
        fixture.container(r#"case "$last" in *.mp3) echo 'Conversion failed!' >&2; exit 1;; esac"#);
    let reporter = ProgressReporter::new();

    let request = fixture.request(30.0, SegmentBounds::new(vec![10.0], vec![20.0]));
    let err = container
        .render_interactor()
        .execute(&request, &reporter, &CancelToken::new())
        .await
        .unwrap_err();

    match err {
        ReelcutError::TranscodeFailed { stderr_tail, .. } => {
            assert!(stderr_tail.contains("Conversion failed!"))
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!reporter.snapshot().active);
    assert!(Fixture::entries(&fixture.processed).is_empty());
    assert!(Fixture::entries(&fixture.temp).is_empty());
}

#[tokio::test]
async fn test_missing_loudness_report_fails_normalization() {
    let fixture = Fixture::new();
    // exits before the report is printed
    let container = fixture.container(r#"case "$last" in *.wav) : > "$last"; exit 0;; esac"#);

    let request = fixture.request(30.0, SegmentBounds::default());
    let err = container
        .render_interactor()
        .execute(&request, &ProgressReporter::new(), &CancelToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReelcutError::NormalizationFailed { .. }));
    assert!(Fixture::entries(&fixture.processed).is_empty());
    assert!(Fixture::entries(&fixture.temp).is_empty());
}

#[tokio::test]
async fn test_cancel_stops_the_job() {
    let fixture = Fixture::new();
    let container = fixture.container(r#"case "$last" in *.wav) exec sleep 30;; esac"#);
    let reporter = ProgressReporter::new();
    let cancel = CancelToken::new();
    let trigger = cancel.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let request = fixture.request(30.0, SegmentBounds::new(vec![10.0], vec![20.0]));
    let err = container
        .render_interactor()
        .execute(&request, &reporter, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ReelcutError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!reporter.snapshot().active);
    assert!(Fixture::entries(&fixture.processed).is_empty());
    assert!(Fixture::entries(&fixture.temp).is_empty());
}

#[tokio::test]
async fn test_second_job_is_refused_while_one_runs() {
    let fixture = Fixture::new();
    let container = fixture.container(":");
    let interactor = container.render_interactor();

    let _running = interactor.gate().try_admit().unwrap();
    let request = fixture.request(30.0, SegmentBounds::default());
    let err = interactor
        .execute(&request, &ProgressReporter::new(), &CancelToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReelcutError::Busy));
    assert!(fixture.engine_calls().is_empty());
}

#[tokio::test]
async fn test_missing_source_is_reported() {
    let fixture = Fixture::new();
    let container = fixture.container(":");

    let mut request = fixture.request(30.0, SegmentBounds::default());
    request.source = fixture.processed.join("missing.mp4");
    let err = container
        .render_interactor()
        .execute(&request, &ProgressReporter::new(), &CancelToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReelcutError::InputFileNotFound { .. }));
}
