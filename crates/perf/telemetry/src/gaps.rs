//! Idle-gap anchors for sparse latency traces.
//!
//! Latency intervals arrive in bursts, while memory and power are sampled on
//! a fixed clock. Plotted on a shared time axis, a line drawn straight across
//! an idle pause would suggest work that never happened. Every gap wider than
//! the threshold therefore gets two zero-length anchor intervals, one just
//! after the earlier burst and one just before the later one, so the plotted
//! latency drops to zero across the pause.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::series::{Sample, Series};

/// One timed inference, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    /// Start time.
    pub start_ms: f64,
    /// End time.
    pub end_ms: f64,
}

impl Interval {
    /// Zero-length interval at `at_ms`.
    pub const fn anchor(at_ms: f64) -> Self {
        Self {
            start_ms: at_ms,
            end_ms: at_ms,
        }
    }

    /// Interval duration.
    pub fn duration_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }

    /// Interval midpoint.
    pub fn midpoint_ms(&self) -> f64 {
        (self.start_ms + self.end_ms) / 2.0
    }
}

/// Gap threshold and anchor margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapPolicy {
    threshold_ms: f64,
    margin_ms: f64,
}

impl GapPolicy {
    /// Default gap threshold.
    pub const DEFAULT_THRESHOLD_MS: f64 = 100.0;
    /// Default anchor margin.
    pub const DEFAULT_MARGIN_MS: f64 = 50.0;

    /// Validate a policy. The margin must satisfy `0 <= margin <= threshold / 2`.
    /// Only gaps strictly wider than the threshold are anchored, so the two
    /// anchors of a gap stay strictly ordered.
    pub fn new(threshold_ms: f64, margin_ms: f64) -> Result<Self> {
        if !(threshold_ms.is_finite() && margin_ms >= 0.0 && margin_ms <= threshold_ms / 2.0) {
            return Err(Error::InvalidGapPolicy {
                threshold_ms,
                margin_ms,
            });
        }
        Ok(Self {
            threshold_ms,
            margin_ms,
        })
    }

    /// Gaps strictly wider than this get anchors.
    pub fn threshold_ms(&self) -> f64 {
        self.threshold_ms
    }

    /// Distance of each anchor from the burst it borders.
    pub fn margin_ms(&self) -> f64 {
        self.margin_ms
    }
}

impl Default for GapPolicy {
    fn default() -> Self {
        Self {
            threshold_ms: Self::DEFAULT_THRESHOLD_MS,
            margin_ms: Self::DEFAULT_MARGIN_MS,
        }
    }
}

/// Add anchor intervals across every gap wider than the policy threshold.
///
/// Gaps are measured between consecutive input intervals, which are expected
/// in start order. The result holds the input plus the anchors, stably sorted
/// by start time.
pub fn insert_gap_anchors(intervals: &[Interval], policy: &GapPolicy) -> Vec<Interval> {
    let mut out = intervals.to_vec();
    for pair in intervals.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if next.start_ms - prev.end_ms > policy.threshold_ms {
            out.push(Interval::anchor(prev.end_ms + policy.margin_ms));
            out.push(Interval::anchor(next.start_ms - policy.margin_ms));
        }
    }
    out.sort_by(|a, b| a.start_ms.total_cmp(&b.start_ms));
    out
}

/// Plotted latency: one sample per interval at its midpoint, valued at its
/// duration. Anchors become zero-valued samples.
pub fn latency_series(intervals: &[Interval]) -> Series {
    Series::new(
        intervals
            .iter()
            .map(|i| Sample::new(i.midpoint_ms(), i.duration_ms()))
            .collect(),
    )
}
