//! Reelcut Library
//!
//! Composes cut segments of a recording into a single timeline with
//! cross-dissolves and fades, normalizes loudness in two passes and renders
//! the result through a supervised ffmpeg process with hardware-aware
//! encoder selection.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod compose;
pub mod domain;
pub mod engine;
pub mod error;
pub mod graph;
pub mod janitor;
pub mod planner;
pub mod ports;
pub mod probe;

#[cfg(all(test, unix))]
mod test_utils;

// Re-export commonly used types
pub use app::{AppContainer, DefaultAppContainer};
pub use domain::model::{
    HardwareChoice, HardwareProfile, ProgressState, RenderReport, RenderRequest, Segment,
    SegmentBounds, TimeSpec,
};
pub use error::{ProbeError, ReelcutError, ReelcutResult};
