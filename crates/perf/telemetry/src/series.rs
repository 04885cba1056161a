//! Time-ordered samples.

use serde::Serialize;

/// One point of a latency, memory or power series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// Timestamp in milliseconds.
    pub timestamp_ms: f64,
    /// Measured value (ms, kB or mW depending on the series).
    pub value: f64,
}

impl Sample {
    /// Create a sample.
    pub const fn new(timestamp_ms: f64, value: f64) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }
}

/// Samples in ascending timestamp order.
///
/// Ordering is established once, on construction, with a stable sort: samples
/// sharing a timestamp keep their input order. A series is never mutated in
/// place; every transformation returns a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Series {
    samples: Vec<Sample>,
}

impl Series {
    /// Build a series, sorting `samples` by timestamp.
    pub fn new(mut samples: Vec<Sample>) -> Self {
        samples.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));
        Self { samples }
    }

    /// Build a series from `(timestamp, value)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self::new(pairs.into_iter().map(|(t, v)| Sample::new(t, v)).collect())
    }

    /// The samples, ascending by timestamp.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the series has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Earliest timestamp.
    pub fn start_ms(&self) -> Option<f64> {
        self.samples.first().map(|s| s.timestamp_ms)
    }

    /// Latest timestamp.
    pub fn end_ms(&self) -> Option<f64> {
        self.samples.last().map(|s| s.timestamp_ms)
    }

    /// Largest value.
    pub fn max_value(&self) -> Option<f64> {
        self.samples.iter().map(|s| s.value).reduce(f64::max)
    }

    /// Iterate over the values in timestamp order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }

    /// Apply `f` to every value, keeping timestamps.
    #[must_use]
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            samples: self
                .samples
                .iter()
                .map(|s| Sample::new(s.timestamp_ms, f(s.value)))
                .collect(),
        }
    }

    /// Shift timestamps so `origin` becomes zero, dropping samples before it.
    #[must_use]
    pub fn aligned_to(&self, origin_ms: f64) -> Self {
        Self {
            samples: self
                .samples
                .iter()
                .map(|s| Sample::new(s.timestamp_ms - origin_ms, s.value))
                .filter(|s| s.timestamp_ms >= 0.0)
                .collect(),
        }
    }

    /// Shift timestamps so the first sample sits at zero.
    #[must_use]
    pub fn zero_origin(&self) -> Self {
        match self.start_ms() {
            Some(start) => self.aligned_to(start),
            None => self.clone(),
        }
    }
}
