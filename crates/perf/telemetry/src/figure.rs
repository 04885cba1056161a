//! Finalized figure data and the renderer contract.
//!
//! Builders here read an [`Aggregate`] and produce plain structures holding
//! exactly what gets drawn. A [`Renderer`] receives those structures and an
//! explicit [`RenderContext`]; it never sees raw traces or shared state.

use std::io;
use std::path::PathBuf;

use log::warn;

use crate::aggregate::{Aggregate, ConfigId, Configuration, Experiment, format_budget};
use crate::series::Series;

/// Name of the plotted latency series of a configuration.
pub const LATENCY_SERIES: &str = "latency";
/// Name of the corrected memory series of a configuration.
pub const MEMORY_SERIES: &str = "memory";
/// Name of the corrected power series of a configuration.
pub const POWER_SERIES: &str = "power";

const KB_PER_MB: f64 = 1000.0;

/// Where and how large figures are drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    figures_dir: PathBuf,
    width: u32,
    height: u32,
}

impl RenderContext {
    /// Context drawing `width` x `height` figures under `figures_dir`.
    pub fn new(figures_dir: impl Into<PathBuf>, (width, height): (u32, u32)) -> Self {
        Self {
            figures_dir: figures_dir.into(),
            width,
            height,
        }
    }

    /// Canvas size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Path of figure `file_name` for `experiment`, creating its directory.
    pub fn figure_path(&self, experiment: Experiment, file_name: &str) -> io::Result<PathBuf> {
        let dir = self.figures_dir.join(experiment.name());
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join(file_name))
    }
}

/// Draws finalized figures.
pub trait Renderer {
    /// Rendering failure.
    type Error;

    /// Grouped bars of ablation latencies.
    fn ablation(&self, ctx: &RenderContext, figure: &AblationFigure) -> Result<PathBuf, Self::Error>;

    /// Latency against memory for one model.
    fn budget(&self, ctx: &RenderContext, figure: &BudgetFigure) -> Result<PathBuf, Self::Error>;

    /// Aligned latency and memory of the adaptive run.
    fn timeline(&self, ctx: &RenderContext, figure: &TimelineFigure) -> Result<PathBuf, Self::Error>;

    /// Corrected power traces of the overhead comparison.
    fn power(&self, ctx: &RenderContext, figure: &PowerFigure) -> Result<PathBuf, Self::Error>;
}

/// One (model, budget) group of ablation bars.
#[derive(Debug, Clone, PartialEq)]
pub struct AblationGroup {
    /// Axis label.
    pub label: String,
    /// Mean latency per setting, aligned with [`AblationFigure::settings`].
    /// `None` marks a configuration that failed or was never run.
    pub latencies_ms: Vec<Option<f64>>,
}

/// Ablation latencies, grouped by model and budget.
#[derive(Debug, Clone, PartialEq)]
pub struct AblationFigure {
    /// Settings, one bar per group each.
    pub settings: Vec<String>,
    /// Groups in first-seen order.
    pub groups: Vec<AblationGroup>,
}

impl AblationFigure {
    /// Build from the ablation configurations of `aggregate`.
    pub fn build(aggregate: &Aggregate, settings: &[String]) -> Self {
        let mut keys: Vec<(String, Option<u64>)> = Vec::new();
        let ids = aggregate
            .configurations()
            .iter()
            .map(|c| &c.id)
            .chain(aggregate.failures().iter().map(|f| &f.id));
        for id in ids.filter(|id| id.experiment == Experiment::Ablation) {
            let key = (id.model.clone(), id.memory_budget_bytes);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        let groups = keys
            .into_iter()
            .map(|(model, budget)| {
                let latencies_ms = settings
                    .iter()
                    .map(|setting| {
                        let id = ConfigId {
                            experiment: Experiment::Ablation,
                            model: model.clone(),
                            setting: setting.clone(),
                            memory_budget_bytes: budget,
                        };
                        let latency = aggregate.get(&id).and_then(|c| c.metrics.mean_latency_ms());
                        if latency.is_none() {
                            warn!("ablation bar {id} has no result and is left empty");
                        }
                        latency
                    })
                    .collect();
                let label = match budget {
                    Some(bytes) => format!("{model} ({})", format_budget(bytes)),
                    None => model,
                };
                AblationGroup { label, latencies_ms }
            })
            .collect();

        Self {
            settings: settings.to_vec(),
            groups,
        }
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.groups
            .iter()
            .all(|g| g.latencies_ms.iter().all(Option::is_none))
    }
}

/// A baseline variant drawn as a single marker.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineMarker {
    /// Variant name.
    pub variant: String,
    /// Peak memory above idle, in MB.
    pub memory_mb: f64,
    /// Mean latency in ms.
    pub latency_ms: f64,
}

/// Latency against memory for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetFigure {
    /// Model name.
    pub model: String,
    /// Setting of the budget sweep.
    pub sweep_setting: String,
    /// `(budget MB, latency ms)`, ascending by budget.
    pub sweep: Vec<(f64, f64)>,
    /// Baseline variants.
    pub baselines: Vec<BaselineMarker>,
}

impl BudgetFigure {
    /// Build the figure of `model`, or `None` when it has no usable result.
    pub fn build(aggregate: &Aggregate, model: &str, sweep_setting: &str) -> Option<Self> {
        let sweep: Vec<(f64, f64)> = aggregate
            .budget_curve(Experiment::End2end, model, sweep_setting)
            .into_iter()
            .map(|p| (p.memory_budget_mb, p.mean_latency_ms))
            .collect();

        let baselines: Vec<BaselineMarker> = aggregate
            .baseline_points(Experiment::End2end, model)
            .into_iter()
            .filter_map(|p| {
                let Some(kb) = p.peak_memory_kb else {
                    warn!("{model}/{}: no peak memory, marker skipped", p.variant);
                    return None;
                };
                Some(BaselineMarker {
                    variant: p.variant,
                    memory_mb: kb / KB_PER_MB,
                    latency_ms: p.mean_latency_ms,
                })
            })
            .collect();

        if sweep.is_empty() && baselines.is_empty() {
            return None;
        }
        Some(Self {
            model: model.to_string(),
            sweep_setting: sweep_setting.to_string(),
            sweep,
            baselines,
        })
    }
}

/// Latency and memory of the adaptive run on a shared, zero-based time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineFigure {
    /// Gap-anchored latency (ms) over time.
    pub latency: Series,
    /// Corrected memory (MB) over time.
    pub memory_mb: Series,
}

impl TimelineFigure {
    /// Build from a configuration holding latency and memory series.
    ///
    /// Both series are shifted so the first latency sample sits at zero;
    /// anything earlier is dropped.
    pub fn build(config: &Configuration) -> Option<Self> {
        let latency = config.series(LATENCY_SERIES)?;
        let memory = config.series(MEMORY_SERIES)?;
        let origin = latency.start_ms()?;
        Some(Self {
            latency: latency.aligned_to(origin),
            memory_mb: memory.aligned_to(origin).map_values(|kb| kb / KB_PER_MB),
        })
    }
}

/// One corrected power trace.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerTrace {
    /// Legend label.
    pub label: String,
    /// Corrected power (mW) with time starting at zero.
    pub series: Series,
    /// Energy of the trace in mJ.
    pub energy_mj: f64,
}

/// Corrected power traces of the overhead comparison.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PowerFigure {
    /// Traces in recording order.
    pub traces: Vec<PowerTrace>,
}

impl PowerFigure {
    /// Build from the overhead configurations of `aggregate`.
    pub fn build(aggregate: &Aggregate) -> Self {
        let traces = aggregate
            .experiment(Experiment::Overhead)
            .filter_map(|c| {
                Some(PowerTrace {
                    label: c.id.setting.clone(),
                    series: c.series(POWER_SERIES)?.zero_origin(),
                    energy_mj: c.metrics.energy?.energy_mj,
                })
            })
            .collect();
        Self { traces }
    }
}
