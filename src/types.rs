//! Shared value types for the physical layer.
//!
//! Contains:
//! - `SimTime`: simulated time with picosecond resolution
//! - `Band`: center frequency and bandwidth of a narrowband channel
//! - `SignalPart`: sub-intervals of a transmitted frame
//!
//! Units:
//! - Frequency: Hz (f64)
//! - Power: W (f64) unless a name carries a `_dbm`/`_db` suffix
//! - Time: `SimTime` inside the core, seconds (f64) at configuration boundaries

use serde::Deserialize;
use std::fmt;
use std::ops::{Add, Sub};

const PICOS_PER_SECOND: f64 = 1e12;

/// Point in simulated time, stored as integer picoseconds.
///
/// Integer storage keeps timestamps totally ordered so they can key a
/// `BTreeMap` without floating point comparison surprises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(i64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    pub const MAX: SimTime = SimTime(i64::MAX);

    pub const fn from_picos(picos: i64) -> Self {
        SimTime(picos)
    }

    pub const fn from_micros(micros: i64) -> Self {
        SimTime(micros * 1_000_000)
    }

    pub const fn from_millis(millis: i64) -> Self {
        SimTime(millis * 1_000_000_000)
    }

    /// Round a duration given in seconds to the nearest picosecond.
    ///
    /// Saturates at `SimTime::MAX`. Use `try_from_secs_f64` for values read
    /// from input files.
    pub fn from_secs_f64(seconds: f64) -> Self {
        SimTime((seconds * PICOS_PER_SECOND).round() as i64)
    }

    /// Like `from_secs_f64`, but `None` for non-finite, negative or unrepresentable values.
    pub fn try_from_secs_f64(seconds: f64) -> Option<Self> {
        let picos = (seconds * PICOS_PER_SECOND).round();
        // i64::MAX as f64 rounds up to 2^63, which is already out of range
        if !picos.is_finite() || picos < 0.0 || picos >= i64::MAX as f64 {
            return None;
        }
        Some(SimTime(picos as i64))
    }

    pub fn checked_add(self, rhs: SimTime) -> Option<SimTime> {
        self.0.checked_add(rhs.0).map(SimTime)
    }

    pub const fn as_picos(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / PICOS_PER_SECOND
    }
}

/// Panics on overflow, like `std::time::Duration`.
impl Add for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0 + rhs.0)
    }
}

impl Sub for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: SimTime) -> SimTime {
        SimTime(self.0 - rhs.0)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.9}s", self.as_secs_f64())
    }
}

/// A narrowband channel.
///
/// Equality is exact on both fields. Two bands that differ by any amount are
/// different bands; there is no tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Band {
    pub center_frequency: f64,
    pub bandwidth: f64,
}

impl Band {
    pub fn new(center_frequency: f64, bandwidth: f64) -> Self {
        Self { center_frequency, bandwidth }
    }

    pub fn lower_edge(&self) -> f64 {
        self.center_frequency - self.bandwidth / 2.0
    }

    pub fn upper_edge(&self) -> f64 {
        self.center_frequency + self.bandwidth / 2.0
    }

    /// True when the two bands share no spectrum at all. Touching edges count as disjoint.
    pub fn is_disjoint(&self, other: &Band) -> bool {
        self.upper_edge() <= other.lower_edge() || other.upper_edge() <= self.lower_edge()
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MHz/{} MHz", self.center_frequency / 1e6, self.bandwidth / 1e6)
    }
}

/// Sub-interval of a transmitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SignalPart {
    #[default]
    Whole,
    Preamble,
    Header,
    Data,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_time_seconds_conversion_is_exact_for_micros() {
        let t = SimTime::from_secs_f64(0.000_192);
        assert_eq!(t, SimTime::from_micros(192));
        assert!((t.as_secs_f64() - 0.000_192).abs() < 1e-15);
    }

    #[test]
    fn sim_time_orders_and_adds() {
        let a = SimTime::from_millis(1);
        let b = a + SimTime::from_micros(5);
        assert!(b > a);
        assert_eq!(b - a, SimTime::from_micros(5));
    }

    #[test]
    fn out_of_range_seconds_are_rejected() {
        assert_eq!(SimTime::try_from_secs_f64(1.5), Some(SimTime::from_millis(1_500)));
        assert_eq!(SimTime::try_from_secs_f64(1.0e7), None);
        assert_eq!(SimTime::try_from_secs_f64(-1.0), None);
        assert_eq!(SimTime::try_from_secs_f64(f64::NAN), None);
        assert_eq!(SimTime::MAX.checked_add(SimTime::from_picos(1)), None);
        assert_eq!(SimTime::ZERO.checked_add(SimTime::from_micros(4)), Some(SimTime::from_micros(4)));
    }

    #[test]
    fn band_disjoint_and_overlap() {
        let a = Band::new(2_405e6, 2e6);
        let b = Band::new(2_410e6, 2e6);
        let c = Band::new(2_406e6, 2e6);
        assert!(a.is_disjoint(&b));
        assert!(!a.is_disjoint(&c));
        // Adjacent channels share only an edge
        let d = Band::new(2_407e6, 2e6);
        assert!(a.is_disjoint(&d));
    }
}
