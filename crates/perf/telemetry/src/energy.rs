//! Energy from baseline-corrected power traces.

use serde::Serialize;

use crate::baseline::CorrectedSeries;
use crate::error::{Error, Result};

/// Power in mW integrated over time in ms yields µJ; divide by this for mJ.
pub const MICROJOULES_PER_MILLIJOULE: f64 = 1000.0;

/// Energy estimate of one power trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyReport {
    /// Trapezoidal energy estimate in mJ.
    pub energy_mj: f64,
    /// Time covered by the trace.
    pub duration_ms: f64,
    /// Mean corrected power.
    pub mean_power_mw: f64,
    /// Peak corrected power.
    pub peak_power_mw: f64,
    /// Idle baseline that was subtracted before integration.
    pub baseline_mw: f64,
    /// Number of power samples.
    pub samples: usize,
}

/// Raw trapezoidal integral of a corrected power trace, in mW·ms (µJ).
pub fn trapezoid(power: &CorrectedSeries) -> Result<f64> {
    let samples = power.series().samples();
    if samples.len() < 2 {
        return Err(Error::InsufficientSamples {
            operation: "energy integration",
            required: 2,
            found: samples.len(),
        });
    }
    Ok(samples
        .windows(2)
        .map(|w| (w[0].value + w[1].value) / 2.0 * (w[1].timestamp_ms - w[0].timestamp_ms))
        .sum())
}

/// Integrate a corrected power trace into an [`EnergyReport`].
pub fn integrate_energy(power: &CorrectedSeries) -> Result<EnergyReport> {
    let microjoules = trapezoid(power)?;
    let series = power.series();
    let n = series.len();

    let (mut sum, mut peak) = (0.0f64, f64::NEG_INFINITY);
    for value in series.values() {
        sum += value;
        peak = peak.max(value);
    }

    Ok(EnergyReport {
        energy_mj: microjoules / MICROJOULES_PER_MILLIJOULE,
        duration_ms: series.end_ms().unwrap_or_default() - series.start_ms().unwrap_or_default(),
        mean_power_mw: sum / n as f64,
        peak_power_mw: peak,
        baseline_mw: power.baseline(),
        samples: n,
    })
}
