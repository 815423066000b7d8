//! Error handling module for Reelcut

use thiserror::Error;

/// Main error type for Reelcut operations
#[derive(Error, Debug)]
pub enum ReelcutError {
    /// Malformed segment bounds, non-positive segment length or an empty clip list
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Input file not found or inaccessible
    #[error("Input file not found: {path}")]
    InputFileNotFound { path: String },

    /// The loudness measurement pass produced no usable report
    #[error("Audio normalization failed: {message}")]
    NormalizationFailed { message: String },

    /// The supervised engine process exited unsuccessfully
    #[error("Transcode failed ({status}): {stderr_tail}")]
    TranscodeFailed { status: String, stderr_tail: String },

    /// The engine binary could not be started
    #[error("Failed to start media engine: {message}")]
    EngineSpawn { message: String },

    /// The operation was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// The job gate refused to admit another job
    #[error("Another render job is already running")]
    Busy,

    /// Configuration loading or validation error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReelcutError {
    /// Shorthand for [`ReelcutError::InvalidInput`]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Result type alias for Reelcut operations
pub type ReelcutResult<T> = std::result::Result<T, ReelcutError>;

/// Probe-level failures. These are always recovered with a safe default and
/// never surface to the caller of a render job.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Engine binary missing or the capability query crashed
    #[error("Engine probe failed: {message}")]
    EngineProbeFailed { message: String },

    /// A requested accelerator is not offered by the engine
    #[error("Accelerator unavailable: {requested}")]
    AcceleratorUnavailable { requested: String },

    /// Stream metadata did not contain a usable frame rate
    #[error("Frame rate unavailable: {message}")]
    FrameRateUnavailable { message: String },
}
