//! Reelcut CLI
//!
//! Cuts the kept segments out of a recording, joins them with
//! cross-dissolves, normalizes loudness and renders a video plus an
//! audio-only artifact using the best encoder the local ffmpeg offers.
//!
//! # Usage
//!
//! ```bash
//! reelcut render --input talk.mp4 --start 0 --end 00:19 --cut-start 9 --cut-end 10
//! reelcut hardware --json
//! reelcut peaks --input talk.mp4
//! reelcut sweep --watch
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use reelcut_cli::adapters::{TomlConfigAdapter, TracingLogAdapter};
use reelcut_cli::cli::{self, Cli};
use reelcut_cli::DefaultAppContainer;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    TracingLogAdapter::init(&cli.log_level, cli.log_json).context("Failed to initialize logging")?;
    info!("Starting Reelcut");

    let settings =
        TomlConfigAdapter::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let container = DefaultAppContainer::new(settings);

    cli::run(&container, cli.command).await?;

    info!("Reelcut completed successfully");
    Ok(())
}
