//! Extraction and normalization of flexnn benchmark telemetry.
//!
//! Turns the raw artifacts of a benchmark run (iteration logs, memory and
//! power traces, latency interval traces) into comparable scalars and aligned
//! time series:
//!
//! - [`latency`]: marker-line extraction with named outlier policies.
//! - [`trace`]: CSV trace loading against a schema checked at the header.
//! - [`baseline`]: idle-window baseline estimation and subtraction.
//! - [`gaps`]: anchor insertion across idle gaps in sparse latency traces.
//! - [`energy`]: trapezoidal energy integration of corrected power.
//! - [`aggregate`]: per-configuration grouping for cross-run comparison.
//! - [`figure`]: finalized figure data and the renderer contract.

pub mod aggregate;
pub mod baseline;
pub mod energy;
pub mod error;
pub mod figure;
pub mod gaps;
pub mod latency;
pub mod series;
pub mod trace;

pub use aggregate::{
    Aggregate, BaselinePoint, BudgetPoint, ConfigAggregator, ConfigId, Configuration, Experiment, FailedConfig, Metrics,
    NamedSeries,
};
pub use baseline::{CorrectedSeries, IdleWindow, peak_delta, subtract_idle_baseline};
pub use energy::{EnergyReport, MICROJOULES_PER_MILLIJOULE, integrate_energy};
pub use error::{Error, ErrorKind, Result};
pub use figure::{AblationFigure, BudgetFigure, PowerFigure, RenderContext, Renderer, TimelineFigure};
pub use gaps::{GapPolicy, Interval, insert_gap_anchors, latency_series};
pub use latency::{LatencyExtraction, LatencySummary, LineFilter, OutlierPolicy};
pub use series::{Sample, Series};
pub use trace::{TraceKind, load_intervals, load_trace};
