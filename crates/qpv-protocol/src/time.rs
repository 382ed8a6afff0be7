//! Simulated time.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// Relative tolerance for timing comparisons.
pub const DEFAULT_TIME_TOLERANCE: f64 = 1e-9;

/// A point on the simulated timeline, in nanoseconds.
///
/// Totally ordered via [`f64::total_cmp`] so it can key a `BTreeMap`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SimTime(f64);

impl SimTime {
    /// The start of every run.
    pub const ZERO: SimTime = SimTime(0.0);

    /// A time `ns` nanoseconds after the start.
    pub fn from_ns(ns: f64) -> Self {
        Self(ns)
    }

    /// Nanoseconds since the start.
    pub fn as_ns(self) -> f64 {
        self.0
    }

    /// `self + delay`, with negative delays clamped to zero.
    pub fn after(self, delay_ns: f64) -> Self {
        Self(self.0 + delay_ns.max(0.0))
    }

    /// Later of two times.
    pub fn max(self, other: Self) -> Self {
        if other > self { other } else { self }
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add<f64> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: f64) -> SimTime {
        SimTime(self.0 + rhs)
    }
}

impl Sub for SimTime {
    type Output = f64;

    fn sub(self, rhs: SimTime) -> f64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6} ns", self.0)
    }
}

/// `a ≤ b`, treating values within `rel_tol` of each other as equal.
pub fn approx_le(a: f64, b: f64, rel_tol: f64) -> bool {
    a <= b || (a - b).abs() <= rel_tol * a.abs().max(b.abs())
}

/// Propagation delay in ns over `length_km` at `speed_km_per_s`.
pub fn propagation_delay_ns(length_km: f64, speed_km_per_s: f64) -> f64 {
    length_km / speed_km_per_s * 1e9
}
