//! Seek strategy planning.
//!
//! Produces the ordered list of timestamps a generation run samples:
//! 1. fixed early offsets, for recordings whose content starts immediately
//! 2. duration-relative fractions, ordered so the positions most likely to
//!    show live content (past intros, before outros) come first
//! 3. binary subdivision of the largest unexplored span for whatever budget
//!    remains
//!
//! No timestamp is ever emitted twice within one plan.

use tracing::debug;

/// Default attempt budget per run.
pub const DEFAULT_MAX_ATTEMPTS: usize = 20;

/// Absolute offsets tried first when the duration is known.
const EARLY_OFFSETS: [f64; 1] = [3.0];

/// Duration fractions, in priority order.
const TIMELINE_FRACTIONS: [f64; 12] = [
    0.10, 0.25, 0.50, 0.75, 0.90, 0.33, 0.66, 0.20, 0.40, 0.60, 0.80, 0.95,
];

/// Absolute offsets used when the duration is unknown.
const UNKNOWN_DURATION_OFFSETS: [f64; 10] =
    [3.0, 1.0, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0];

/// Two timestamps closer than this are the same seek target.
const MIN_SPACING_SECS: f64 = 0.25;

/// Distance kept from the end of the stream; seeking to the very end
/// usually decodes nothing.
const END_GUARD_SECS: f64 = 0.5;

/// Plans candidate timestamps for a video.
#[derive(Debug, Clone)]
pub struct SeekPlanner {
    max_attempts: usize,
}

impl Default for SeekPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl SeekPlanner {
    pub fn new(max_attempts: usize) -> Self {
        Self { max_attempts }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Build the plan for a video of the given duration (seconds).
    ///
    /// An unknown, non-finite or non-positive duration falls back to a fixed
    /// list of absolute offsets.
    pub fn plan(&self, duration: Option<f64>) -> Vec<f64> {
        let duration = duration.filter(|d| d.is_finite() && *d > 0.0);

        let plan = match duration {
            Some(duration) => self.plan_for_duration(duration),
            None => UNKNOWN_DURATION_OFFSETS
                .iter()
                .copied()
                .take(self.max_attempts)
                .collect(),
        };

        debug!(duration = ?duration, planned = plan.len(), "Planned seek offsets");
        plan
    }

    fn plan_for_duration(&self, duration: f64) -> Vec<f64> {
        let latest = (duration - END_GUARD_SECS).max(duration * 0.5);
        let mut plan = Vec::with_capacity(self.max_attempts);

        let fixed = EARLY_OFFSETS
            .iter()
            .copied()
            .chain(TIMELINE_FRACTIONS.iter().map(|f| f * duration));

        for t in fixed {
            if plan.len() >= self.max_attempts {
                return plan;
            }
            let t = round_millis(t);
            if t <= latest && !is_taken(&plan, t) {
                plan.push(t);
            }
        }

        while plan.len() < self.max_attempts {
            match largest_gap_midpoint(&plan, latest) {
                Some(t) if !is_taken(&plan, t) => plan.push(t),
                _ => break,
            }
        }

        plan
    }
}

fn round_millis(t: f64) -> f64 {
    (t * 1000.0).round() / 1000.0
}

fn is_taken(plan: &[f64], t: f64) -> bool {
    plan.iter().any(|&p| (p - t).abs() < MIN_SPACING_SECS)
}

/// Midpoint of the widest span between already-planned offsets, bounded by
/// the start of the stream and `latest`. `None` once every span is too
/// narrow to split.
fn largest_gap_midpoint(plan: &[f64], latest: f64) -> Option<f64> {
    let mut points: Vec<f64> = plan.to_vec();
    points.push(0.0);
    points.push(latest);
    points.sort_by(|a, b| a.total_cmp(b));
    points.dedup();

    // Earliest span wins ties
    let mut widest: Option<(f64, f64)> = None;
    for w in points.windows(2) {
        if widest.map_or(true, |(s, e)| w[1] - w[0] > e - s) {
            widest = Some((w[0], w[1]));
        }
    }
    let (start, end) = widest?;

    if end - start < 2.0 * MIN_SPACING_SECS {
        return None;
    }
    Some(round_millis(start + (end - start) / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_unique(plan: &[f64]) {
        for (i, a) in plan.iter().enumerate() {
            for b in &plan[i + 1..] {
                assert!((a - b).abs() >= MIN_SPACING_SECS, "duplicate {} / {} in {:?}", a, b, plan);
            }
        }
    }

    #[test]
    fn test_two_minute_video_covers_start_and_end() {
        let plan = SeekPlanner::new(20).plan(Some(120.0));

        assert_eq!(plan.len(), 20);
        assert!(plan.iter().any(|&t| t <= 5.0), "{:?}", plan);
        assert!(plan.iter().any(|&t| t >= 108.0 && t < 120.0), "{:?}", plan);
        assert_eq!(plan[0], 3.0);
        assert_unique(&plan);
    }

    #[test]
    fn test_never_duplicates_across_durations() {
        let planner = SeekPlanner::new(40);
        for duration in [0.2, 0.9, 2.0, 3.0, 7.5, 30.0, 61.0, 600.0, 7200.0, 36000.0] {
            let plan = planner.plan(Some(duration));
            assert!(!plan.is_empty());
            assert!(plan.len() <= 40);
            assert_unique(&plan);
            assert!(plan.iter().all(|&t| t >= 0.0 && t < duration), "{} -> {:?}", duration, plan);
        }
    }

    #[test]
    fn test_budget_limits_plan() {
        let plan = SeekPlanner::new(4).plan(Some(3600.0));
        assert_eq!(plan, vec![3.0, 360.0, 900.0, 1800.0]);

        assert!(SeekPlanner::new(0).plan(Some(3600.0)).is_empty());
    }

    #[test]
    fn test_unknown_duration_uses_fixed_offsets() {
        let planner = SeekPlanner::new(5);
        let expected = vec![3.0, 1.0, 5.0, 10.0, 15.0];
        assert_eq!(planner.plan(None), expected);
        assert_eq!(planner.plan(Some(0.0)), expected);
        assert_eq!(planner.plan(Some(-4.0)), expected);
        assert_eq!(planner.plan(Some(f64::NAN)), expected);
    }

    #[test]
    fn test_subdivision_fills_largest_gap() {
        // Fixed offsets yield 13 points for a long video; the rest subdivide.
        let plan = SeekPlanner::new(14).plan(Some(1000.0));
        assert_eq!(plan.len(), 14);
        // Widest spans after the fixed offsets are 100s long; the earliest
        // one, [100, 200], is split first
        assert_eq!(plan[13], 150.0);
    }

    #[test]
    fn test_short_video_skips_early_offset_past_end() {
        let plan = SeekPlanner::new(20).plan(Some(2.0));
        assert!(plan.iter().all(|&t| t <= 1.5));
        assert!(!plan.contains(&3.0));
        assert_unique(&plan);
    }
}
