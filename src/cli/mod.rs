//! CLI module for Reelcut
//!
//! This module handles command-line argument parsing and command dispatch.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::AppContainer;

pub mod args;
pub mod commands;

/// Reelcut
///
/// Assembles cut segments of a recording into one timeline with
/// cross-dissolves, fades and two-pass loudness normalization, then renders
/// a video and an audio-only artifact with the best available encoder.
#[derive(Parser, Debug)]
#[command(name = "reelcut")]
#[command(about = "Reelcut - clip assembly and hardware-aware transcoding on top of ffmpeg")]
#[command(version)]
pub struct Cli {
    /// Config file (default: reelcut.toml, then config/reelcut.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cut, compose and render the video and audio artifacts
    Render(args::RenderArgs),
    /// Show the hardware acceleration the engine offers
    Hardware(args::HardwareArgs),
    /// Print the frame rate of a media file
    Fps(args::FpsArgs),
    /// Generate (or read cached) waveform peaks for a media file
    Peaks(args::PeaksArgs),
    /// Delete expired uploads and temp artifacts
    Sweep(args::SweepArgs),
}

/// Run `command` against the wired application
pub async fn run(container: &dyn AppContainer, command: Commands) -> Result<()> {
    match command {
        Commands::Render(args) => commands::render(container, args).await,
        Commands::Hardware(args) => commands::hardware(container, args).await,
        Commands::Fps(args) => commands::fps(container, args).await,
        Commands::Peaks(args) => commands::peaks(container, args).await,
        Commands::Sweep(args) => commands::sweep(container, args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_render_arguments() {
        let cli = Cli::try_parse_from([
            "reelcut",
            "--log-level",
            "debug",
            "render",
            "--input",
            "talk.mp4",
            "--start",
            "0",
            "--end",
            "00:30",
            "--cut-start",
            "10",
            "--cut-end",
            "20",
            "--hardware",
            "intel",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.input, PathBuf::from("talk.mp4"));
                assert_eq!(args.cut_start, vec!["10"]);
                assert_eq!(args.cut_end, vec!["20"]);
                assert_eq!(args.hardware.as_deref(), Some("intel"));
                assert_eq!(args.progress, args::ProgressArg::Console);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_render_requires_input() {
        assert!(Cli::try_parse_from(["reelcut", "render", "--start", "0", "--end", "5"]).is_err());
    }
}
