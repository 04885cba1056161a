//! Latency extraction from benchmark run logs.
//!
//! A run log is free text. Timed iterations are the lines containing a marker
//! token; their latency is the second-to-last whitespace-separated field,
//! optionally gated on a trailing `ms` unit field.
//!
//! Two outlier policies exist and are deliberately kept apart, because
//! different experiments were reported with different ones:
//!
//! - [`OutlierPolicy::ZScore`]: drop samples whose population z-score
//!   magnitude reaches the threshold.
//! - [`OutlierPolicy::TrimExtremes`]: drop exactly one minimum and one maximum.

use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::error::{Error, Result, read_input};

/// Unit field accepted by unit-checked extraction.
const UNIT_MS: &str = "ms";

/// Default z-score threshold.
pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 3.0;

/// Which lines of a run log carry a latency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFilter {
    /// Substring identifying timed-iteration lines.
    pub marker: String,
    /// Discard marker lines whose last field is not `ms`.
    pub require_ms_unit: bool,
}

impl LineFilter {
    /// Match every line containing `marker`.
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            require_ms_unit: false,
        }
    }

    /// Additionally require the trailing `ms` unit field.
    #[must_use]
    pub fn with_ms_unit(mut self) -> Self {
        self.require_ms_unit = true;
        self
    }
}

/// Outlier rejection applied before averaging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutlierPolicy {
    /// Drop samples with `|x - mean| / stddev >= threshold`.
    ZScore {
        /// Rejection threshold on the z-score magnitude.
        threshold: f64,
    },
    /// Sort and drop one minimum and one maximum sample.
    TrimExtremes,
}

/// Mean latency of one run log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencySummary {
    /// Mean of the samples that survived outlier rejection.
    pub mean_ms: f64,
    /// Samples extracted from the log.
    pub candidates: usize,
    /// Samples that survived outlier rejection.
    pub kept: usize,
}

impl LatencySummary {
    /// Samples removed by outlier rejection.
    pub fn dropped(&self) -> usize {
        self.candidates - self.kept
    }
}

/// Line filter plus outlier policy: everything needed to reduce a log.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyExtraction {
    /// Which lines carry latencies.
    pub filter: LineFilter,
    /// How outliers are rejected.
    pub policy: OutlierPolicy,
}

impl LatencyExtraction {
    /// Marker lines without unit check, z-score rejection.
    pub fn zscore(marker: impl Into<String>, threshold: f64) -> Self {
        Self {
            filter: LineFilter::new(marker),
            policy: OutlierPolicy::ZScore { threshold },
        }
    }

    /// Unit-checked marker lines, min/max trimming.
    pub fn trimmed(marker: impl Into<String>) -> Self {
        Self {
            filter: LineFilter::new(marker).with_ms_unit(),
            policy: OutlierPolicy::TrimExtremes,
        }
    }

    /// Reduce log text to a mean latency.
    pub fn summarize(&self, text: &str) -> Result<LatencySummary> {
        let samples = extract_samples(text, &self.filter)?;
        let kept = match self.policy {
            OutlierPolicy::ZScore { threshold } => reject_zscore_outliers(&samples, threshold)?,
            OutlierPolicy::TrimExtremes => trim_extremes(&samples)?,
        };
        Ok(LatencySummary {
            mean_ms: mean(&kept),
            candidates: samples.len(),
            kept: kept.len(),
        })
    }

    /// Reduce the log at `path` to a mean latency.
    pub fn summarize_file(&self, path: &Path) -> Result<LatencySummary> {
        let text = read_input(path)?;
        self.summarize(&text).map_err(|e| e.in_file(path))
    }
}

/// Extract latency samples (ms) in file order.
pub fn extract_samples(text: &str, filter: &LineFilter) -> Result<Vec<f64>> {
    let mut samples = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        if !line.contains(filter.marker.as_str()) {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if filter.require_ms_unit && fields.last() != Some(&UNIT_MS) {
            continue;
        }

        let malformed = |reason: String| Error::MalformedLine {
            line: idx + 1,
            reason,
        };

        if fields.len() < 2 {
            return Err(malformed(format!("expected at least 2 fields, got {}", fields.len())));
        }
        let field = fields[fields.len() - 2];
        let latency: f64 = field
            .parse()
            .map_err(|_| malformed(format!("latency field `{field}` is not a number")))?;
        if !latency.is_finite() || latency <= 0.0 {
            return Err(malformed(format!("latency {latency} is not positive and finite")));
        }
        samples.push(latency);
    }

    if samples.is_empty() {
        return Err(Error::EmptyInput {
            marker: filter.marker.clone(),
        });
    }
    Ok(samples)
}

/// Keep the samples whose population z-score magnitude is below `threshold`.
///
/// When every sample is equal the standard deviation is zero, no z-score is
/// defined, and all samples are kept.
pub fn reject_zscore_outliers(samples: &[f64], threshold: f64) -> Result<Vec<f64>> {
    if samples.is_empty() {
        return Err(Error::InsufficientSamples {
            operation: "z-score outlier rejection",
            required: 1,
            found: 0,
        });
    }

    let mean = mean(samples);
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    let stddev = variance.sqrt();
    if stddev == 0.0 {
        debug!("z-score undefined for {} identical samples; keeping all", samples.len());
        return Ok(samples.to_vec());
    }

    let kept: Vec<f64> = samples
        .iter()
        .copied()
        .filter(|x| ((x - mean) / stddev).abs() < threshold)
        .collect();
    if kept.is_empty() {
        return Err(Error::InsufficientSamples {
            operation: "z-score outlier rejection",
            required: 1,
            found: 0,
        });
    }
    debug!("z-score rejection kept {} of {} samples", kept.len(), samples.len());
    Ok(kept)
}

/// Sort ascending and drop one minimum and one maximum sample.
pub fn trim_extremes(samples: &[f64]) -> Result<Vec<f64>> {
    if samples.len() < 3 {
        return Err(Error::InsufficientSamples {
            operation: "min/max trimming",
            required: 3,
            found: samples.len(),
        });
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(sorted[1..sorted.len() - 1].to_vec())
}

fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}
