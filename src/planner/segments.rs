//! Segment planning: turns a kept range plus cut intervals into the ordered
//! list of source ranges that survive the edit.

use tracing::{debug, info, warn};

use crate::domain::model::{Segment, SegmentBounds};
use crate::error::{ReelcutError, ReelcutResult};

/// Planner for the kept segments of a source clip
#[derive(Debug, Default, Clone, Copy)]
pub struct SegmentPlanner;

impl SegmentPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Plan the segments covering `[start_time, end_time]` minus the cuts.
    ///
    /// Mismatched or empty cut lists fall back to one full-range segment.
    /// Cut points outside the range, out of order, or producing an empty
    /// segment are rejected rather than dropped, since every segment feeds
    /// the timeline duration.
    pub fn plan(
        &self,
        start_time: f64,
        end_time: f64,
        bounds: &SegmentBounds,
    ) -> ReelcutResult<Vec<Segment>> {
        if !start_time.is_finite() || !end_time.is_finite() || start_time < 0.0 {
            return Err(ReelcutError::invalid(format!(
                "Invalid time range: {} - {}",
                start_time, end_time
            )));
        }
        if end_time <= start_time {
            return Err(ReelcutError::invalid(format!(
                "End time ({:.3}s) must be after start time ({:.3}s)",
                end_time, start_time
            )));
        }

        if !bounds.is_usable() {
            if !bounds.clip_start.is_empty() || !bounds.clip_end.is_empty() {
                warn!(
                    clip_start = bounds.clip_start.len(),
                    clip_end = bounds.clip_end.len(),
                    "Ignoring mismatched cut lists, keeping the full range"
                );
            }
            return Ok(vec![Segment {
                start: start_time,
                end: end_time,
            }]);
        }

        // start <= s0 <= e0 <= s1 <= e1 ... <= end
        let mut previous = start_time;
        for (i, (&cut_start, &cut_end)) in bounds
            .clip_start
            .iter()
            .zip(bounds.clip_end.iter())
            .enumerate()
        {
            for value in [cut_start, cut_end] {
                if !value.is_finite() || value < start_time || value > end_time {
                    return Err(ReelcutError::invalid(format!(
                        "Cut point {:.3}s (cut {}) lies outside {:.3}s - {:.3}s",
                        value, i, start_time, end_time
                    )));
                }
                if value < previous {
                    return Err(ReelcutError::invalid(format!(
                        "Cut points must be non-decreasing; {:.3}s follows {:.3}s (cut {})",
                        value, previous, i
                    )));
                }
                previous = value;
            }
        }

        let count = bounds.clip_start.len() + 1;
        let mut segments = Vec::with_capacity(count);
        for i in 0..count {
            let seg_start = if i == 0 {
                start_time
            } else {
                bounds.clip_end[i - 1]
            };
            let seg_end = if i == count - 1 {
                end_time
            } else {
                bounds.clip_start[i]
            };
            let segment = Segment {
                start: seg_start,
                end: seg_end,
            };
            if segment.duration() <= 0.0 {
                return Err(ReelcutError::invalid(format!(
                    "Segment {} ({:.3}s - {:.3}s) has no length",
                    i, seg_start, seg_end
                )));
            }
            debug!(index = i, start = seg_start, end = seg_end, "Planned segment");
            segments.push(segment);
        }

        info!("Planned {} segment(s)", segments.len());
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cuts(starts: &[f64], ends: &[f64]) -> SegmentBounds {
        SegmentBounds::new(starts.to_vec(), ends.to_vec())
    }

    #[test]
    fn test_single_cut_scenario() {
        let segments = SegmentPlanner::new()
            .plan(0.0, 30.0, &cuts(&[10.0], &[20.0]))
            .unwrap();
        assert_eq!(
            segments,
            vec![
                Segment { start: 0.0, end: 10.0 },
                Segment { start: 20.0, end: 30.0 },
            ]
        );
    }

    #[test]
    fn test_no_cuts_is_one_segment() {
        let segments = SegmentPlanner::new()
            .plan(2.5, 8.0, &SegmentBounds::default())
            .unwrap();
        assert_eq!(segments, vec![Segment { start: 2.5, end: 8.0 }]);
    }

    #[test]
    fn test_mismatched_cuts_fall_back_to_full_range() {
        let segments = SegmentPlanner::new()
            .plan(0.0, 30.0, &cuts(&[10.0, 15.0], &[12.0]))
            .unwrap();
        assert_eq!(segments, vec![Segment { start: 0.0, end: 30.0 }]);
    }

    #[test]
    fn test_segments_tile_the_range() {
        let planner = SegmentPlanner::new();
        let cases: Vec<(f64, f64, Vec<f64>, Vec<f64>)> = vec![
            (0.0, 60.0, vec![5.0, 20.0, 40.0], vec![10.0, 30.0, 41.5]),
            (3.0, 9.0, vec![4.0], vec![4.0]),
            (1.0, 100.0, vec![2.0, 50.0], vec![49.0, 99.0]),
        ];

        for (start, end, starts, ends) in cases {
            let bounds = cuts(&starts, &ends);
            let segments = planner.plan(start, end, &bounds).unwrap();
            assert_eq!(segments.len(), starts.len() + 1);
            assert_eq!(segments[0].start, start);
            assert_eq!(segments.last().unwrap().end, end);
            for (i, segment) in segments.iter().enumerate() {
                assert!(segment.duration() > 0.0);
                if i > 0 {
                    // each gap between segments is exactly one cut interval
                    assert_eq!(segments[i - 1].end, starts[i - 1]);
                    assert_eq!(segment.start, ends[i - 1]);
                }
            }
            let kept: f64 = segments.iter().map(Segment::duration).sum();
            let removed: f64 = starts.iter().zip(&ends).map(|(s, e)| e - s).sum();
            assert!((kept + removed - (end - start)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_degenerate_segment_is_rejected() {
        let err = SegmentPlanner::new()
            .plan(0.0, 30.0, &cuts(&[0.0], &[20.0]))
            .unwrap_err();
        assert!(matches!(err, ReelcutError::InvalidInput { .. }));

        let err = SegmentPlanner::new()
            .plan(0.0, 30.0, &cuts(&[10.0], &[30.0]))
            .unwrap_err();
        assert!(matches!(err, ReelcutError::InvalidInput { .. }));
    }

    #[test]
    fn test_out_of_range_and_unordered_cuts_are_rejected() {
        let planner = SegmentPlanner::new();
        assert!(planner.plan(0.0, 30.0, &cuts(&[10.0], &[31.0])).is_err());
        assert!(planner.plan(0.0, 30.0, &cuts(&[20.0], &[10.0])).is_err());
        assert!(planner
            .plan(0.0, 30.0, &cuts(&[5.0, 8.0], &[10.0, 12.0]))
            .is_err());
    }

    #[test]
    fn test_invalid_range_is_rejected() {
        let planner = SegmentPlanner::new();
        assert!(planner.plan(10.0, 10.0, &SegmentBounds::default()).is_err());
        assert!(planner.plan(10.0, 5.0, &SegmentBounds::default()).is_err());
        assert!(planner.plan(f64::NAN, 5.0, &SegmentBounds::default()).is_err());
    }
}
