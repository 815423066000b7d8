//! Command implementations

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::app::{AppContainer, HardwareReport};
use crate::cli::args::{FpsArgs, HardwareArgs, PeaksArgs, RenderArgs, SweepArgs};
use crate::domain::model::{HardwareChoice, RenderReport, RenderRequest, SegmentBounds, TimeSpec};
use crate::engine::progress::spawn_printer;
use crate::engine::{CancelToken, ProgressReporter};
use crate::probe::{frame_rate_or_default, PeakExtractor};

/// Cancel `cancel` on the first Ctrl+C
fn cancel_on_interrupt(cancel: &CancelToken) -> JoinHandle<()> {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            cancel.cancel();
        }
    })
}

fn parse_times(values: &[String], what: &str) -> Result<Vec<f64>> {
    values
        .iter()
        .map(|v| {
            TimeSpec::parse(v)
                .map(|t| t.as_seconds())
                .with_context(|| format!("Invalid {} '{}'", what, v))
        })
        .collect()
}

/// Execute the render command
pub async fn render(container: &dyn AppContainer, args: RenderArgs) -> Result<()> {
    let settings = container.settings();

    let start_time = TimeSpec::parse(&args.start)
        .with_context(|| format!("Invalid start time '{}'", args.start))?;
    let end_time = TimeSpec::parse(&args.end)
        .with_context(|| format!("Invalid end time '{}'", args.end))?;
    let cuts = SegmentBounds::new(
        parse_times(&args.cut_start, "cut start")?,
        parse_times(&args.cut_end, "cut end")?,
    );
    let hardware = args
        .hardware
        .as_deref()
        .unwrap_or(settings.engine.hardware.as_str())
        .parse::<HardwareChoice>()
        .unwrap_or(HardwareChoice::Auto);

    let request = RenderRequest {
        source: args.input,
        still_image: args.image,
        start_time: start_time.as_seconds(),
        end_time: end_time.as_seconds(),
        cuts,
        hardware,
        output_dir: args
            .output_dir
            .unwrap_or_else(|| settings.storage.processed_dir.clone()),
    };
    info!(
        source = %request.source.display(),
        start = %start_time,
        end = %end_time,
        cuts = request.cuts.clip_start.len(),
        "Starting render"
    );

    let reporter = ProgressReporter::new();
    let printer = spawn_printer(reporter.subscribe(), args.progress.into());
    let cancel = CancelToken::new();
    let interrupt = cancel_on_interrupt(&cancel);

    let result = container
        .render_interactor()
        .execute(&request, &reporter, &cancel)
        .await;

    interrupt.abort();
    drop(reporter);
    let _ = printer.await;

    let report = result.context("Render failed")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display_render_report(&report);
    }
    Ok(())
}

fn display_render_report(report: &RenderReport) {
    println!("Video:    {}", report.video_path.display());
    println!("Audio:    {}", report.audio_path.display());
    println!(
        "Hardware: {} (requested {}{})",
        report.hardware.profile.friendly_name(),
        report.hardware.requested,
        if report.hardware.downgraded {
            ", unavailable"
        } else {
            ""
        }
    );
    println!(
        "Duration: video {}, audio {}",
        TimeSpec::from_seconds(report.video_duration).format_hms(),
        TimeSpec::from_seconds(report.audio_duration).format_hms()
    );
    if report.intro {
        println!("Intro:    still image");
    }
}

/// Execute the hardware command
pub async fn hardware(container: &dyn AppContainer, args: HardwareArgs) -> Result<()> {
    let report = container.hardware_interactor().report().await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display_hardware_report(&report);
    }
    Ok(())
}

fn display_hardware_report(report: &HardwareReport) {
    match &report.engine_version {
        Some(version) => println!("Engine:   {}", version),
        None => println!("Engine:   not installed"),
    }
    println!("Detected: {} ({})", report.detected_friendly, report.detected);
    if report.available.is_empty() {
        println!("Available: none");
    } else {
        println!("Available:");
        for (name, friendly) in report.available.iter().zip(&report.friendly) {
            println!("  {:<14} {}", name, friendly);
        }
    }
    if let Some(error) = &report.error {
        println!("Error:    {}", error);
    }
}

/// Execute the fps command
pub async fn fps(container: &dyn AppContainer, args: FpsArgs) -> Result<()> {
    let fps = frame_rate_or_default(container.stream_probe().as_ref(), &args.input).await;
    if args.json {
        println!("{}", serde_json::json!({ "fps": fps }));
    } else {
        println!("{}", fps);
    }
    Ok(())
}

/// Execute the peaks command
pub async fn peaks(container: &dyn AppContainer, args: PeaksArgs) -> Result<()> {
    let settings = container.settings();
    let engine = container.engine();
    let extractor = PeakExtractor::new(engine.as_ref(), &settings.storage.temp_dir);

    let cancel = CancelToken::new();
    let interrupt = cancel_on_interrupt(&cancel);
    let result = if args.refresh {
        extractor.generate(&args.input, &cancel).await
    } else {
        extractor.load_or_generate(&args.input, &cancel).await
    };
    interrupt.abort();

    let peaks = result.context("Failed to generate peaks data")?;
    println!("{}", serde_json::to_string(&peaks)?);
    Ok(())
}

/// Execute the sweep command
pub async fn sweep(container: &dyn AppContainer, args: SweepArgs) -> Result<()> {
    let janitor = container.janitor();
    if janitor.rules().is_empty() {
        info!("Cache cleanup is disabled for every directory");
        return Ok(());
    }

    if args.watch {
        let interval = container.settings().janitor.interval();
        let cancel = CancelToken::new();
        let interrupt = cancel_on_interrupt(&cancel);
        info!(interval_secs = interval.as_secs(), "Janitor running until interrupted");
        janitor
            .spawn_periodic(interval, cancel)
            .await
            .context("Janitor task failed")?;
        interrupt.abort();
        return Ok(());
    }

    let report = tokio::task::spawn_blocking(move || janitor.sweep())
        .await
        .context("Sweep task failed")?;
    println!(
        "Deleted {} file(s), {} failure(s)",
        report.deleted_count(),
        report.failed
    );
    Ok(())
}
