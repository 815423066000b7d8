//! Timeline composition: clip building, transitions and fade envelopes.
//!
//! Everything here only appends nodes to a [`FilterGraph`](crate::graph::FilterGraph);
//! nothing touches media until a supervised run renders the graph.

use crate::graph::{AudioNode, VideoNode};

pub mod clip;
pub mod envelope;
pub mod transition;

pub use clip::{ClipBuilder, ClipFraming};
pub use envelope::EnvelopeApplier;
pub use transition::TransitionCompositor;

/// One trimmed, zero-based unit ready for composition
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub video: VideoNode,
    pub audio: AudioNode,
    pub duration: f64,
}

/// Cumulative composition of clips
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub video: VideoNode,
    pub audio: AudioNode,
    /// Authoritative duration for envelopes, normalization and progress
    pub duration: f64,
    /// Start of each transition, relative to the running composite
    pub transition_offsets: Vec<f64>,
}

impl From<Clip> for Timeline {
    fn from(clip: Clip) -> Self {
        Self {
            video: clip.video,
            audio: clip.audio,
            duration: clip.duration,
            transition_offsets: Vec::new(),
        }
    }
}
