//! Sparse power-versus-time functions built from power change events.
//!
//! A `PowerTimeline` maps timestamps to signed power deltas (W). The
//! instantaneous power at `t` is the sum of all deltas stamped at or before
//! `t`, so the function is piecewise constant and right-continuous. Several
//! timelines compose by superposition: the union of their events, with
//! deltas summed where timestamps collide.
//!
//! ## Interval queries
//!
//! `compute_min_power` / `compute_max_power` evaluate the power over
//! `[start, end]`, taking the value at `end` as the left limit: an event stamped
//! exactly at `end` has not happened yet inside the interval. This makes a
//! signal that rises at `start` and falls at `end` read as fully present over
//! its own interval. A degenerate interval (`start == end`) returns the power
//! at `start`.
//!
//! Queries sweep only the recorded events, so their cost depends on the
//! number of events and never on time resolution.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use crate::types::SimTime;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerTimeline {
    changes: BTreeMap<SimTime, f64>,
}

impl PowerTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single rectangular pulse of `power` over `[start, end)`.
    pub fn pulse(start: SimTime, end: SimTime, power: f64) -> Self {
        let mut timeline = Self::new();
        timeline.insert(start, power);
        timeline.insert(end, -power);
        timeline
    }

    /// Add a power change at `timestamp`, accumulating with any change already there.
    ///
    /// A timestamp whose deltas cancel out exactly is dropped to keep the map
    /// sparse. Cancellation across different timestamps is left to floating
    /// point: after the last event the power is the rounded sum of all deltas,
    /// which may differ from zero by a few ulps of the largest level reached.
    pub fn insert(&mut self, timestamp: SimTime, delta: f64) {
        let entry = self.changes.entry(timestamp).or_insert(0.0);
        *entry += delta;
        if *entry == 0.0 {
            self.changes.remove(&timestamp);
        }
    }

    /// Superposition of `self` and `other`.
    pub fn merge(&self, other: &PowerTimeline) -> PowerTimeline {
        let mut merged = self.clone();
        merged.merge_from(other);
        merged
    }

    /// In-place superposition, consuming nothing.
    pub fn merge_from(&mut self, other: &PowerTimeline) {
        for (&timestamp, &delta) in &other.changes {
            self.insert(timestamp, delta);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Recorded change events in ascending timestamp order.
    pub fn changes(&self) -> impl Iterator<Item = (SimTime, f64)> + '_ {
        self.changes.iter().map(|(&t, &d)| (t, d))
    }

    /// Instantaneous aggregate power at `t` (sum of all deltas at or before `t`).
    pub fn power_at(&self, t: SimTime) -> f64 {
        self.changes.range(..=t).map(|(_, d)| d).sum()
    }

    pub fn compute_max_power(&self, start: SimTime, end: SimTime) -> f64 {
        self.sweep(start, end, f64::max)
    }

    pub fn compute_min_power(&self, start: SimTime, end: SimTime) -> f64 {
        self.sweep(start, end, f64::min)
    }

    /// Running-sum sweep over the events strictly inside `(start, end)`, seeded
    /// with the power carried in at `start`.
    fn sweep(&self, start: SimTime, end: SimTime, pick: fn(f64, f64) -> f64) -> f64 {
        let mut power = self.power_at(start);
        let mut extreme = power;
        if end <= start {
            return extreme;
        }
        for (&timestamp, &delta) in self.changes.range((Excluded(start), Unbounded)) {
            if timestamp >= end {
                break;
            }
            power += delta;
            extreme = pick(extreme, power);
        }
        extreme
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn us(v: i64) -> SimTime {
        SimTime::from_micros(v)
    }

    fn staircase() -> PowerTimeline {
        // 0 .. 10: 1 W, 10 .. 20: 3 W, 20 .. 30: 2 W, then 0
        let mut t = PowerTimeline::new();
        t.insert(us(0), 1.0);
        t.insert(us(10), 2.0);
        t.insert(us(20), -1.0);
        t.insert(us(30), -2.0);
        t
    }

    #[test]
    fn insert_accumulates_and_drops_cancelled_changes() {
        let mut t = PowerTimeline::new();
        t.insert(us(5), 1.0);
        t.insert(us(5), 0.5);
        assert_eq!(t.len(), 1);
        assert_eq!(t.power_at(us(5)), 1.5);
        t.insert(us(5), -1.5);
        assert!(t.is_empty());
    }

    #[test]
    fn pulse_reads_fully_present_over_its_own_interval() {
        let t = PowerTimeline::pulse(us(10), us(20), 2.0);
        assert_eq!(t.compute_min_power(us(10), us(20)), 2.0);
        assert_eq!(t.compute_max_power(us(10), us(20)), 2.0);
        assert_eq!(t.power_at(us(20)), 0.0);
        assert_eq!(t.power_at(us(9)), 0.0);
    }

    #[test]
    fn max_and_min_sweep_the_staircase() {
        let t = staircase();
        assert_eq!(t.compute_max_power(us(0), us(30)), 3.0);
        assert_eq!(t.compute_min_power(us(0), us(30)), 1.0);
        assert_eq!(t.compute_max_power(us(25), us(40)), 2.0);
        assert_eq!(t.compute_min_power(us(25), us(40)), 0.0);
    }

    #[test]
    fn interval_without_events_carries_prior_power() {
        let t = staircase();
        assert_eq!(t.compute_max_power(us(12), us(18)), 3.0);
        assert_eq!(t.compute_min_power(us(12), us(18)), 3.0);
        assert_eq!(PowerTimeline::new().compute_max_power(us(0), us(100)), 0.0);
        assert_eq!(t.compute_max_power(us(-20), us(-10)), 0.0);
    }

    #[test]
    fn degenerate_interval_returns_power_at_start() {
        let t = staircase();
        assert_eq!(t.compute_max_power(us(10), us(10)), 3.0);
        assert_eq!(t.compute_min_power(us(15), us(15)), 3.0);
    }

    #[test]
    fn merge_sums_colliding_timestamps() {
        let a = PowerTimeline::pulse(us(0), us(10), 1.0);
        let b = PowerTimeline::pulse(us(5), us(10), 2.0);
        let m = a.merge(&b);
        assert_eq!(m.len(), 3);
        assert_eq!(m.power_at(us(7)), 3.0);
        assert_eq!(m.power_at(us(10)), 0.0);
        assert_eq!(m.compute_max_power(us(0), us(10)), 3.0);
        assert_eq!(m.compute_min_power(us(0), us(10)), 1.0);
    }

    #[test]
    fn merge_never_lowers_max_for_non_negative_contributions() {
        let a = staircase();
        let b = PowerTimeline::pulse(us(22), us(27), 0.5);
        let m = a.merge(&b);
        for (s, e) in [(0, 30), (20, 30), (22, 27), (5, 25), (29, 31)] {
            assert!(m.compute_max_power(us(s), us(e)) >= a.compute_max_power(us(s), us(e)));
        }
    }

    #[test]
    fn sub_interval_stays_within_containing_interval_bounds() {
        let t = staircase().merge(&PowerTimeline::pulse(us(3), us(7), 4.0));
        let outer = (us(0), us(30));
        let outer_max = t.compute_max_power(outer.0, outer.1);
        let outer_min = t.compute_min_power(outer.0, outer.1);
        for (s, e) in [(0, 5), (4, 6), (6, 12), (10, 20), (19, 29), (0, 30)] {
            assert!(t.compute_max_power(us(s), us(e)) <= outer_max);
            assert!(t.compute_min_power(us(s), us(e)) >= outer_min);
        }
    }

    #[test]
    fn baseline_after_mixed_pulses_is_zero_within_rounding() {
        let mut t = PowerTimeline::new();
        t.merge_from(&PowerTimeline::pulse(us(0), us(100), 1.234_567e-13));
        t.merge_from(&PowerTimeline::pulse(us(20), us(70), 7.654_321e-11));
        t.merge_from(&PowerTimeline::pulse(us(50), us(150), 3.3e-12));
        let peak = t.compute_max_power(us(0), us(150));
        assert!(t.power_at(us(150)).abs() <= peak * 4.0 * f64::EPSILON);

        // Same-timestamp cancellation is exact and leaves no event behind
        let mut u = PowerTimeline::pulse(us(0), us(100), 7.654_321e-11);
        u.merge_from(&PowerTimeline::pulse(us(0), us(100), -7.654_321e-11));
        assert!(u.is_empty());
        assert_eq!(u.power_at(us(150)), 0.0);
    }
}
