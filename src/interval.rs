//! Half-open interval algebra.
//!
//! Every interval in this crate is `[start, end)`: the start is inclusive and
//! the end exclusive, so two intervals that merely touch at a boundary point
//! do not overlap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Returns `true` iff `[a_start, a_end)` and `[b_start, b_end)` intersect.
///
/// Both intervals must satisfy `start < end`; field validation upstream
/// rejects anything else before it reaches this test.
pub fn overlaps<T: PartialOrd>(a_start: &T, a_end: &T, b_start: &T, b_end: &T) -> bool {
    a_start < b_end && b_start < a_end
}

/// A non-empty `[start, end)` time range.
///
/// # Invariants
/// `start` is always strictly before `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Interval {
    /// Builds an interval, or `None` when `start >= end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        overlaps(&self.start, &self.end, &other.start, &other.end)
    }

    /// Whether `[start, end)` overlaps this interval.
    ///
    /// An empty or inverted range never overlaps anything.
    pub fn overlaps_range(&self, start: &DateTime<Utc>, end: &DateTime<Utc>) -> bool {
        start < end && overlaps(&self.start, &self.end, start, end)
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        &self.start <= instant && instant < &self.end
    }
}
