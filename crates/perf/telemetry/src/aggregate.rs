//! Per-configuration results, grouped for cross-configuration comparison.
//!
//! A [`ConfigAggregator`] collects one [`Configuration`] (or one failure) per
//! [`ConfigId`] during a single pass, then freezes into an [`Aggregate`] that
//! only hands out shared references. Grouping and sorting happen there; no
//! statistics are recomputed.

use std::collections::BTreeSet;
use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::energy::EnergyReport;
use crate::latency::LatencySummary;
use crate::series::Series;

/// Bytes in one (decimal) megabyte, the unit budgets are quoted in.
pub const BYTES_PER_MB: u64 = 1_000_000;

/// `1500000` → `1.5MB`, `100000000` → `100MB`.
pub fn format_budget(bytes: u64) -> String {
    if bytes % BYTES_PER_MB == 0 {
        format!("{}MB", bytes / BYTES_PER_MB)
    } else {
        format!("{}MB", bytes as f64 / BYTES_PER_MB as f64)
    }
}

/// Experiment a configuration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Experiment {
    /// Per-setting latency with features disabled one at a time.
    Ablation,
    /// Latency and memory of a run adapting to a changing memory budget.
    Adaption,
    /// Latency against memory budget, plus fixed baseline variants.
    End2end,
    /// Power draw and energy against a reference runtime.
    Overhead,
}

impl Experiment {
    /// Every experiment, in reporting order.
    pub const ALL: [Self; 4] = [Self::Ablation, Self::Adaption, Self::End2end, Self::Overhead];

    /// Lowercase name, also used as the figure subdirectory.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ablation => "ablation",
            Self::Adaption => "adaption",
            Self::End2end => "end2end",
            Self::Overhead => "overhead",
        }
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of one benchmark configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigId {
    /// Owning experiment.
    pub experiment: Experiment,
    /// Model name, e.g. `vgg19`.
    pub model: String,
    /// Runtime setting or baseline variant, e.g. `flexnn` or `ondemand`.
    pub setting: String,
    /// Memory budget in bytes; absent for unconstrained baseline variants.
    pub memory_budget_bytes: Option<u64>,
}

impl ConfigId {
    /// Identity without a memory budget.
    pub fn new(experiment: Experiment, model: impl Into<String>, setting: impl Into<String>) -> Self {
        Self {
            experiment,
            model: model.into(),
            setting: setting.into(),
            memory_budget_bytes: None,
        }
    }

    /// Attach a memory budget given in whole MB.
    #[must_use]
    pub fn with_budget_mb(self, mb: u64) -> Self {
        self.with_budget_bytes(mb.saturating_mul(BYTES_PER_MB))
    }

    /// Attach a memory budget given in bytes.
    #[must_use]
    pub fn with_budget_bytes(mut self, bytes: u64) -> Self {
        self.memory_budget_bytes = Some(bytes);
        self
    }

    /// Memory budget in MB, if any.
    pub fn memory_budget_mb(&self) -> Option<f64> {
        self.memory_budget_bytes.map(|b| b as f64 / BYTES_PER_MB as f64)
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.experiment, self.model, self.setting)?;
        if let Some(bytes) = self.memory_budget_bytes {
            write!(f, "@{}", format_budget(bytes))?;
        }
        Ok(())
    }
}

/// Scalar results of one configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    /// Mean latency after outlier rejection.
    pub latency: Option<LatencySummary>,
    /// Peak memory above the idle baseline, in kB.
    pub peak_memory_kb: Option<f64>,
    /// Energy of the corrected power trace.
    pub energy: Option<EnergyReport>,
}

impl Metrics {
    /// Mean latency in ms, if measured.
    pub fn mean_latency_ms(&self) -> Option<f64> {
        self.latency.map(|l| l.mean_ms)
    }
}

/// A named series owned by a configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSeries {
    /// Series role, e.g. `latency`, `memory` or `power`.
    pub name: String,
    /// The samples.
    pub series: Series,
}

/// Write-once result of one configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Configuration {
    /// Identity.
    pub id: ConfigId,
    /// Scalar results.
    pub metrics: Metrics,
    /// Time series, omitted from serialized summaries.
    #[serde(skip)]
    pub series: Vec<NamedSeries>,
}

impl Configuration {
    /// Empty result for `id`.
    pub fn new(id: ConfigId) -> Self {
        Self {
            id,
            metrics: Metrics::default(),
            series: Vec::new(),
        }
    }

    /// Set the latency summary.
    #[must_use]
    pub fn with_latency(mut self, latency: LatencySummary) -> Self {
        self.metrics.latency = Some(latency);
        self
    }

    /// Set the peak memory delta (kB).
    #[must_use]
    pub fn with_peak_memory(mut self, kb: f64) -> Self {
        self.metrics.peak_memory_kb = Some(kb);
        self
    }

    /// Set the energy report.
    #[must_use]
    pub fn with_energy(mut self, energy: EnergyReport) -> Self {
        self.metrics.energy = Some(energy);
        self
    }

    /// Attach a named series.
    #[must_use]
    pub fn with_series(mut self, name: impl Into<String>, series: Series) -> Self {
        self.series.push(NamedSeries {
            name: name.into(),
            series,
        });
        self
    }

    /// Series named `name`.
    pub fn series(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.name == name).map(|s| &s.series)
    }
}

/// A configuration that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedConfig {
    /// Identity.
    pub id: ConfigId,
    /// Rendered error chain, including the offending file.
    pub error: String,
}

/// One point of a latency-versus-budget curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetPoint {
    /// Memory budget in bytes.
    pub memory_budget_bytes: u64,
    /// Memory budget in MB.
    pub memory_budget_mb: f64,
    /// Mean latency in ms.
    pub mean_latency_ms: f64,
}

/// Single-point result of a named baseline variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselinePoint {
    /// Variant name.
    pub variant: String,
    /// Mean latency in ms.
    pub mean_latency_ms: f64,
    /// Peak memory above idle, in kB.
    pub peak_memory_kb: Option<f64>,
}

/// Collects configuration results during one processing pass.
#[derive(Debug, Default)]
pub struct ConfigAggregator {
    seen: BTreeSet<ConfigId>,
    configurations: Vec<Configuration>,
    failures: Vec<FailedConfig>,
    duplicates: Vec<ConfigId>,
}

impl ConfigAggregator {
    /// Empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful configuration.
    ///
    /// Identities are write-once: if `config.id` was already recorded (as a
    /// result or a failure) the first entry wins, the newcomer is dropped, and
    /// the id is listed in [`Aggregate::duplicates`]. Returns whether the
    /// configuration was kept.
    pub fn record(&mut self, config: Configuration) -> bool {
        if !self.seen.insert(config.id.clone()) {
            warn!("duplicate configuration {}; keeping the first result", config.id);
            self.duplicates.push(config.id);
            return false;
        }
        self.configurations.push(config);
        true
    }

    /// Record a configuration that failed. Follows the same keep-first rule.
    pub fn record_failure(&mut self, id: ConfigId, error: impl fmt::Display) -> bool {
        if !self.seen.insert(id.clone()) {
            warn!("duplicate configuration {id}; keeping the first result");
            self.duplicates.push(id);
            return false;
        }
        let error = format!("{error:#}");
        warn!("configuration {id} failed: {error}");
        self.failures.push(FailedConfig { id, error });
        true
    }

    /// Freeze the collected results.
    pub fn finish(self) -> Aggregate {
        Aggregate {
            configurations: self.configurations,
            failures: self.failures,
            duplicates: self.duplicates,
        }
    }
}

/// Frozen results of a processing pass.
#[derive(Debug, Default, Serialize)]
pub struct Aggregate {
    configurations: Vec<Configuration>,
    failures: Vec<FailedConfig>,
    duplicates: Vec<ConfigId>,
}

impl Aggregate {
    /// Successful configurations, in recording order.
    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    /// Failed configurations, in recording order.
    pub fn failures(&self) -> &[FailedConfig] {
        &self.failures
    }

    /// Rejected duplicate identities.
    pub fn duplicates(&self) -> &[ConfigId] {
        &self.duplicates
    }

    /// Result for `id`.
    pub fn get(&self, id: &ConfigId) -> Option<&Configuration> {
        self.configurations.iter().find(|c| &c.id == id)
    }

    /// Successful configurations of `experiment`.
    pub fn experiment(&self, experiment: Experiment) -> impl Iterator<Item = &Configuration> {
        self.configurations
            .iter()
            .filter(move |c| c.id.experiment == experiment)
    }

    /// Models of `experiment` (successful or failed), in first-seen order.
    pub fn models(&self, experiment: Experiment) -> Vec<&str> {
        let mut models: Vec<&str> = Vec::new();
        let ids = self
            .configurations
            .iter()
            .map(|c| &c.id)
            .chain(self.failures.iter().map(|f| &f.id));
        for id in ids.filter(|id| id.experiment == experiment) {
            if !models.contains(&id.model.as_str()) {
                models.push(&id.model);
            }
        }
        models
    }

    /// Mean latency per memory budget for one model and setting, strictly
    /// ascending by budget.
    pub fn budget_curve(&self, experiment: Experiment, model: &str, setting: &str) -> Vec<BudgetPoint> {
        let mut curve: Vec<BudgetPoint> = self
            .experiment(experiment)
            .filter(|c| c.id.model == model && c.id.setting == setting)
            .filter_map(|c| {
                Some(BudgetPoint {
                    memory_budget_bytes: c.id.memory_budget_bytes?,
                    memory_budget_mb: c.id.memory_budget_mb()?,
                    mean_latency_ms: c.metrics.mean_latency_ms()?,
                })
            })
            .collect();
        curve.sort_by_key(|p| p.memory_budget_bytes);
        curve
    }

    /// Results of budget-less variants of `model`, in recording order.
    pub fn baseline_points(&self, experiment: Experiment, model: &str) -> Vec<BaselinePoint> {
        self.experiment(experiment)
            .filter(|c| c.id.model == model && c.id.memory_budget_bytes.is_none())
            .filter_map(|c| {
                Some(BaselinePoint {
                    variant: c.id.setting.clone(),
                    mean_latency_ms: c.metrics.mean_latency_ms()?,
                    peak_memory_kb: c.metrics.peak_memory_kb,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latency(mean_ms: f64) -> LatencySummary {
        LatencySummary {
            mean_ms,
            candidates: 10,
            kept: 8,
        }
    }

    fn sweep(budget: u64, mean_ms: f64) -> Configuration {
        Configuration::new(ConfigId::new(Experiment::End2end, "vgg19", "flexnn").with_budget_mb(budget))
            .with_latency(latency(mean_ms))
    }

    #[test]
    fn budget_curve_is_strictly_ascending() {
        let mut agg = ConfigAggregator::new();
        for (budget, mean) in [(500, 10.0), (100, 40.0), (300, 15.0), (200, 22.0)] {
            assert!(agg.record(sweep(budget, mean)));
        }
        let agg = agg.finish();
        let curve = agg.budget_curve(Experiment::End2end, "vgg19", "flexnn");
        let budgets: Vec<f64> = curve.iter().map(|p| p.memory_budget_mb).collect();
        assert_eq!(budgets, [100.0, 200.0, 300.0, 500.0]);
        assert!(curve.windows(2).all(|w| w[0].memory_budget_bytes < w[1].memory_budget_bytes));
        assert_eq!(curve[0].mean_latency_ms, 40.0);
    }

    #[test]
    fn duplicate_budget_keeps_first() {
        let mut agg = ConfigAggregator::new();
        assert!(agg.record(sweep(100, 40.0)));
        assert!(!agg.record(sweep(100, 99.0)));
        let agg = agg.finish();
        let curve = agg.budget_curve(Experiment::End2end, "vgg19", "flexnn");
        assert_eq!(curve.len(), 1);
        assert_eq!(curve[0].mean_latency_ms, 40.0);
        assert_eq!(agg.duplicates().len(), 1);
    }

    #[test]
    fn failure_blocks_later_success_for_same_id() {
        let mut agg = ConfigAggregator::new();
        let id = ConfigId::new(Experiment::Ablation, "vgg19", "wo_mem").with_budget_mb(100);
        agg.record_failure(id.clone(), "no line contains the marker `loop`");
        assert!(!agg.record(Configuration::new(id.clone()).with_latency(latency(1.0))));
        let agg = agg.finish();
        assert!(agg.get(&id).is_none());
        assert_eq!(agg.failures()[0].id, id);
    }

    #[test]
    fn baselines_are_budgetless_configurations() {
        let mut agg = ConfigAggregator::new();
        agg.record(sweep(100, 40.0));
        for (variant, mean) in [("default", 12.0), ("direct", 14.0)] {
            agg.record(
                Configuration::new(ConfigId::new(Experiment::End2end, "vgg19", variant))
                    .with_latency(latency(mean))
                    .with_peak_memory(2048.0),
            );
        }
        let agg = agg.finish();
        let points = agg.baseline_points(Experiment::End2end, "vgg19");
        let variants: Vec<&str> = points.iter().map(|p| p.variant.as_str()).collect();
        assert_eq!(variants, ["default", "direct"]);
        assert_eq!(points[1].peak_memory_kb, Some(2048.0));
    }

    #[test]
    fn models_include_failed_configurations() {
        let mut agg = ConfigAggregator::new();
        agg.record(sweep(100, 40.0));
        agg.record_failure(ConfigId::new(Experiment::End2end, "gpt2", "default"), "boom");
        let agg = agg.finish();
        assert_eq!(agg.models(Experiment::End2end), ["vgg19", "gpt2"]);
    }

    #[test]
    fn config_id_display() {
        let id = ConfigId::new(Experiment::Ablation, "resnet152", "wo_all").with_budget_mb(500);
        assert_eq!(id.to_string(), "ablation/resnet152/wo_all@500MB");
    }

    #[test]
    fn sub_megabyte_budgets_stay_distinct() {
        let whole = ConfigId::new(Experiment::Ablation, "vgg19", "flexnn").with_budget_bytes(1_000_000);
        let half = ConfigId::new(Experiment::Ablation, "vgg19", "flexnn").with_budget_bytes(1_500_000);
        assert_ne!(whole, half);
        assert_eq!(whole.to_string(), "ablation/vgg19/flexnn@1MB");
        assert_eq!(half.to_string(), "ablation/vgg19/flexnn@1.5MB");

        let mut agg = ConfigAggregator::new();
        assert!(agg.record(Configuration::new(whole).with_latency(latency(10.0))));
        assert!(agg.record(Configuration::new(half).with_latency(latency(12.0))));
        assert!(agg.finish().duplicates().is_empty());
    }
}
