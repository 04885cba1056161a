//! Idle-baseline correction for memory and power traces.
//!
//! Each trace starts (and for power, also ends) with the device idle. The
//! baseline is the *maximum* reading inside that idle window, a worst-case
//! ambient estimate, and is subtracted from every sample. Corrected values
//! below zero are legitimate: the device dipped under its idle peak.

use std::fmt;

use crate::error::{Error, Result};
use crate::series::Series;

/// Which samples count as idle.
///
/// Window membership is strict: a sample exactly `width_ms` away from the
/// trace boundary is outside the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IdleWindow {
    /// Samples with `t < t_min + width_ms`.
    Leading {
        /// Window width.
        width_ms: f64,
    },
    /// Leading samples plus samples with `t > t_max - width_ms`.
    LeadingTrailing {
        /// Width of each window.
        width_ms: f64,
    },
}

impl IdleWindow {
    /// Default idle window of memory traces.
    pub const MEMORY: Self = Self::Leading { width_ms: 3000.0 };
    /// Default idle window of power traces.
    pub const POWER: Self = Self::LeadingTrailing { width_ms: 1000.0 };

    fn contains(&self, t: f64, start: f64, end: f64) -> bool {
        match *self {
            Self::Leading { width_ms } => t < start + width_ms,
            Self::LeadingTrailing { width_ms } => t < start + width_ms || t > end - width_ms,
        }
    }
}

impl fmt::Display for IdleWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leading { width_ms } => write!(f, "leading {width_ms} ms"),
            Self::LeadingTrailing { width_ms } => write!(f, "leading+trailing {width_ms} ms"),
        }
    }
}

/// A series with its idle baseline removed.
///
/// Only [`subtract_idle_baseline`] creates one, which is what lets energy
/// integration demand corrected input.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedSeries {
    series: Series,
    baseline: f64,
}

impl CorrectedSeries {
    /// Corrected samples.
    pub fn series(&self) -> &Series {
        &self.series
    }

    /// Value that was subtracted from every sample.
    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Unwrap into the corrected series.
    pub fn into_series(self) -> Series {
        self.series
    }
}

/// Maximum value among the samples inside `window`.
pub fn idle_baseline(series: &Series, window: IdleWindow) -> Result<f64> {
    let (Some(start), Some(end)) = (series.start_ms(), series.end_ms()) else {
        return Err(Error::EmptyIdleWindow {
            window: window.to_string(),
        });
    };
    series
        .samples()
        .iter()
        .filter(|s| window.contains(s.timestamp_ms, start, end))
        .map(|s| s.value)
        .reduce(f64::max)
        .ok_or_else(|| Error::EmptyIdleWindow {
            window: window.to_string(),
        })
}

/// Subtract the idle baseline from every sample.
pub fn subtract_idle_baseline(series: &Series, window: IdleWindow) -> Result<CorrectedSeries> {
    let baseline = idle_baseline(series, window)?;
    Ok(CorrectedSeries {
        series: series.map_values(|v| v - baseline),
        baseline,
    })
}

/// Peak value above the idle baseline.
pub fn peak_delta(series: &Series, window: IdleWindow) -> Result<f64> {
    let corrected = subtract_idle_baseline(series, window)?;
    corrected.series.max_value().ok_or(Error::InsufficientSamples {
        operation: "peak delta",
        required: 1,
        found: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn trace() -> Series {
        Series::from_pairs([
            (0.0, 100.0),
            (1000.0, 120.0),
            (2999.0, 110.0),
            (3000.0, 500.0),
            (5000.0, 900.0),
            (6000.0, 90.0),
        ])
    }

    #[test]
    fn leading_baseline_is_window_maximum() {
        assert_eq!(idle_baseline(&trace(), IdleWindow::MEMORY).unwrap(), 120.0);
    }

    #[test]
    fn window_boundary_is_exclusive() {
        // The sample at exactly t_min + 3000 (value 500) is not idle.
        let corrected = subtract_idle_baseline(&trace(), IdleWindow::MEMORY).unwrap();
        assert_eq!(corrected.baseline(), 120.0);
    }

    #[test]
    fn idle_window_peaks_at_zero_after_correction() {
        let original = trace();
        let corrected = subtract_idle_baseline(&original, IdleWindow::MEMORY).unwrap();
        let idle_max = original
            .samples()
            .iter()
            .zip(corrected.series().samples())
            .filter(|(o, _)| o.timestamp_ms < 3000.0)
            .map(|(_, c)| c.value)
            .reduce(f64::max)
            .unwrap();
        assert_eq!(idle_max, 0.0);
    }

    #[test]
    fn correction_keeps_timestamps_and_allows_negatives() {
        let corrected = subtract_idle_baseline(&trace(), IdleWindow::MEMORY).unwrap();
        let last = corrected.series().samples().last().copied().unwrap();
        assert_eq!((last.timestamp_ms, last.value), (6000.0, -30.0));
    }

    #[test]
    fn leading_trailing_includes_tail() {
        let s = Series::from_pairs([(0.0, 10.0), (2000.0, 50.0), (4000.0, 30.0)]);
        let window = IdleWindow::LeadingTrailing { width_ms: 1000.0 };
        assert_eq!(idle_baseline(&s, window).unwrap(), 30.0);
    }

    #[test]
    fn trailing_window_boundary_is_exclusive() {
        // t_max - W = 3000; the spike sitting exactly there is not idle.
        let s = Series::from_pairs([(0.0, 10.0), (2000.0, 50.0), (3000.0, 99.0), (4000.0, 30.0)]);
        let window = IdleWindow::LeadingTrailing { width_ms: 1000.0 };
        assert_eq!(idle_baseline(&s, window).unwrap(), 30.0);
    }

    #[test]
    fn zero_width_window_is_empty() {
        let err = idle_baseline(&trace(), IdleWindow::Leading { width_ms: 0.0 }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyIdleWindow);
    }

    #[test]
    fn empty_series_has_empty_window() {
        let err = idle_baseline(&Series::default(), IdleWindow::MEMORY).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyIdleWindow);
    }

    #[test]
    fn peak_delta_is_max_minus_baseline() {
        assert_eq!(peak_delta(&trace(), IdleWindow::MEMORY).unwrap(), 780.0);
    }
}
