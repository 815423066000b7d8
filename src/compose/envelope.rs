//! Fade-in / fade-out envelope for a composed timeline

use crate::compose::Timeline;
use crate::graph::{format_seconds, Filter, FilterGraph};

/// Applies matching fades to the head and tail of both tracks. Must run
/// after all transitions are folded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeApplier {
    fade: f64,
}

impl EnvelopeApplier {
    pub fn new(fade: f64) -> Self {
        Self { fade }
    }

    pub fn apply(&self, graph: &mut FilterGraph, timeline: Timeline) -> Timeline {
        let fade = format_seconds(self.fade);
        let fade_out_start = format_seconds(timeline.duration - self.fade);

        let video = graph.video(
            timeline.video,
            Filter::new("fade")
                .named("type", "in")
                .named("duration", &fade),
        );
        let video = graph.video(
            video,
            Filter::new("fade")
                .named("type", "out")
                .named("start_time", &fade_out_start)
                .named("duration", &fade),
        );

        let audio = graph.audio(
            timeline.audio,
            Filter::new("afade")
                .named("type", "in")
                .named("start_sample", 0)
                .named("duration", &fade),
        );
        let audio = graph.audio(
            audio,
            Filter::new("afade")
                .named("type", "out")
                .named("start_time", &fade_out_start)
                .named("duration", &fade),
        );

        Timeline {
            video,
            audio,
            ..timeline
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{MediaInput, OutputPad};

    #[test]
    fn test_fades_use_timeline_duration() {
        let mut graph = FilterGraph::new();
        let input = graph.add_input(MediaInput::file("in.mp4"));
        let timeline = Timeline {
            video: graph.video_of(input),
            audio: graph.audio_of(input),
            duration: 19.0,
            transition_offsets: vec![9.0],
        };

        let faded = EnvelopeApplier::new(1.0).apply(&mut graph, timeline);
        assert_eq!(faded.duration, 19.0);
        assert_eq!(faded.transition_offsets, vec![9.0]);

        let rendered = graph
            .render(&[OutputPad::Video(faded.video), OutputPad::Audio(faded.audio)])
            .unwrap();
        assert_eq!(
            rendered.filter_complex.as_deref(),
            Some(
                "[0:v:0]fade=type=in:duration=1[v0];\
[v0]fade=type=out:start_time=18:duration=1[v1];\
[0:a:0]afade=type=in:start_sample=0:duration=1[a2];\
[a2]afade=type=out:start_time=18:duration=1[a3]"
            )
        );
    }
}
