//! Transition compositor

use tracing::debug;

use crate::compose::{Clip, Timeline};
use crate::error::{ReelcutError, ReelcutResult};
use crate::graph::{format_seconds, Filter, FilterGraph};

/// Folds clips left to right with a cross-dissolve on video and a
/// triangular cross-fade on audio of the same length
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionCompositor {
    duration: f64,
}

impl TransitionCompositor {
    pub fn new(duration: f64) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    fn dissolve(&self, offset: f64) -> Filter {
        Filter::new("xfade")
            .named("transition", "fade")
            .named("duration", format_seconds(self.duration))
            .named("offset", format_seconds(offset))
    }

    fn crossfade(&self) -> Filter {
        Filter::new("acrossfade")
            .named("d", format_seconds(self.duration))
            .named("c1", "tri")
            .named("c2", "tri")
    }

    /// Resulting duration is `sum(durations) - (n - 1) * duration`.
    /// Offsets are not clamped: a clip shorter than the transition yields a
    /// negative offset.
    pub fn compose<I>(&self, graph: &mut FilterGraph, clips: I) -> ReelcutResult<Timeline>
    where
        I: IntoIterator<Item = Clip>,
    {
        let mut clips = clips.into_iter();
        let first = clips
            .next()
            .ok_or_else(|| ReelcutError::invalid("Cannot compose an empty clip list"))?;

        let mut timeline = Timeline::from(first);
        for clip in clips {
            let offset = timeline.duration - self.duration;
            if offset < 0.0 {
                debug!(offset, cumulative = timeline.duration, "Transition starts before the composite");
            }

            timeline.video = graph.join_video(timeline.video, clip.video, self.dissolve(offset));
            timeline.audio = graph.join_audio(timeline.audio, clip.audio, self.crossfade());
            timeline.duration += clip.duration - self.duration;
            timeline.transition_offsets.push(offset);
        }

        debug!(
            duration = timeline.duration,
            transitions = timeline.transition_offsets.len(),
            "Timeline composed"
        );
        Ok(timeline)
    }
}
