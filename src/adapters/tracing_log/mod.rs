// Tracing log adapter - structured logging using the tracing crate

use tracing_subscriber::EnvFilter;

use crate::error::{ReelcutError, ReelcutResult};

/// Levels accepted by `--log-level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Tracing log adapter
pub struct TracingLogAdapter;

impl TracingLogAdapter {
    /// Build the filter: `RUST_LOG` wins over `level` when set
    pub fn filter(level: &str) -> ReelcutResult<EnvFilter> {
        let level = level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ReelcutError::Config {
                message: format!("Invalid log level '{}'", level),
            });
        }
        Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
    }

    /// Install the global subscriber. Logs go to stderr so stdout stays
    /// free for command output. A second call is a no-op.
    pub fn init(level: &str, json: bool) -> ReelcutResult<()> {
        let filter = Self::filter(level)?;
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false);

        let _ = if json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        Ok(())
    }
}
