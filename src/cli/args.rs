//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::engine::ProgressStyle;

/// How progress is shown while rendering
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressArg {
    /// Progress bar on stderr
    Console,
    /// JSON events on stdout
    Json,
    /// No progress output
    Silent,
}

impl From<ProgressArg> for ProgressStyle {
    fn from(arg: ProgressArg) -> Self {
        match arg {
            ProgressArg::Console => ProgressStyle::Console,
            ProgressArg::Json => ProgressStyle::Json,
            ProgressArg::Silent => ProgressStyle::Silent,
        }
    }
}

/// Arguments for the render command
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Source media file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Start time (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub start: String,

    /// End time (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub end: String,

    /// Start of a removed interval; repeat, paired with --cut-end
    #[arg(long = "cut-start", value_name = "TIME")]
    pub cut_start: Vec<String>,

    /// End of a removed interval; repeat, paired with --cut-start
    #[arg(long = "cut-end", value_name = "TIME")]
    pub cut_end: Vec<String>,

    /// Still image shown as an intro before the video
    #[arg(long, value_name = "FILE")]
    pub image: Option<PathBuf>,

    /// Accelerator: auto, cpu, cuda, intel, apple or vaapi
    #[arg(long)]
    pub hardware: Option<String>,

    /// Directory for the artifacts (default: storage.processed_dir)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Progress display
    #[arg(long, value_enum, default_value = "console")]
    pub progress: ProgressArg,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the hardware command
#[derive(Args, Debug)]
pub struct HardwareArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the fps command
#[derive(Args, Debug)]
pub struct FpsArgs {
    /// Media file to probe
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the peaks command
#[derive(Args, Debug)]
pub struct PeaksArgs {
    /// Media file to analyse
    #[arg(short, long)]
    pub input: PathBuf,

    /// Ignore any cached result
    #[arg(long)]
    pub refresh: bool,
}

/// Arguments for the sweep command
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Keep sweeping every janitor.interval_hours until interrupted
    #[arg(long)]
    pub watch: bool,
}
