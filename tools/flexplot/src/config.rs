//! Settings loaded from `<RESULTS_ROOT>/flexplot.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use flexnn_telemetry::latency::DEFAULT_ZSCORE_THRESHOLD;
use flexnn_telemetry::{GapPolicy, IdleWindow, LatencyExtraction};
use serde::Deserialize;

use crate::manifest::RunEntry;
use crate::verbose::Verbosity;

/// Settings file name, looked up in the results root.
pub const SETTINGS_FILE: &str = "flexplot.toml";

/// Tunables of a flexplot run. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Progress output level.
    pub verbosity: Verbosity,
    /// Figures directory, relative to the results root.
    pub figures_dir: PathBuf,
    /// Marker token of timed-iteration log lines.
    pub marker: String,
    /// Z-score threshold of ablation runs.
    pub zscore_threshold: f64,
    /// Leading idle window of memory traces.
    pub memory_idle_ms: f64,
    /// Leading and trailing idle windows of power traces.
    pub power_idle_ms: f64,
    /// Gaps strictly wider than this get anchors.
    pub gap_threshold_ms: f64,
    /// Anchor distance from the bordering burst.
    pub gap_margin_ms: f64,
    /// Figure size in pixels.
    pub canvas: [u32; 2],
    /// Ablation settings, in bar order.
    pub ablation_settings: Vec<String>,
    /// Models of the end-to-end experiment.
    pub end2end_models: Vec<String>,
    /// Baseline variants of the end-to-end experiment.
    pub end2end_baselines: Vec<String>,
    /// Setting whose runs sweep the memory budget.
    pub sweep_setting: String,
    /// Explicit run manifest; replaces directory discovery when non-empty.
    #[serde(rename = "run")]
    pub runs: Vec<RunEntry>,
}

impl Default for Settings {
    fn default() -> Self {
        let strings = |items: &[&str]| -> Vec<String> { items.iter().map(ToString::to_string).collect() };
        Self {
            verbosity: Verbosity::Default,
            figures_dir: PathBuf::from("figures"),
            marker: "loop".into(),
            zscore_threshold: DEFAULT_ZSCORE_THRESHOLD,
            memory_idle_ms: 3000.0,
            power_idle_ms: 1000.0,
            gap_threshold_ms: GapPolicy::DEFAULT_THRESHOLD_MS,
            gap_margin_ms: GapPolicy::DEFAULT_MARGIN_MS,
            canvas: [1024, 768],
            ablation_settings: strings(&["flexnn", "wo_all", "wo_mem", "wo_preload"]),
            end2end_models: strings(&["vgg19", "resnet152", "mobilenetv2", "squeezenet", "vit", "gpt2"]),
            end2end_baselines: strings(&["default", "direct", "ondemand"]),
            sweep_setting: "flexnn".into(),
            runs: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings for `root`, falling back to defaults when the file is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings: Self =
            toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject thresholds and idle windows no run could use.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("zscore_threshold", self.zscore_threshold),
            ("memory_idle_ms", self.memory_idle_ms),
            ("power_idle_ms", self.power_idle_ms),
        ] {
            ensure!(
                value.is_finite() && value > 0.0,
                "Invalid {key} in {SETTINGS_FILE}: expected a positive number, got {value}"
            );
        }
        self.gap_policy()?;
        Ok(())
    }

    /// Absolute figures directory.
    pub fn figures_root(&self, root: &Path) -> PathBuf {
        root.join(&self.figures_dir)
    }

    /// Extraction used for ablation logs.
    pub fn ablation_extraction(&self) -> LatencyExtraction {
        LatencyExtraction::zscore(self.marker.clone(), self.zscore_threshold)
    }

    /// Extraction used for end-to-end logs.
    pub fn end2end_extraction(&self) -> LatencyExtraction {
        LatencyExtraction::trimmed(self.marker.clone())
    }

    /// Idle window of memory traces.
    pub fn memory_window(&self) -> IdleWindow {
        IdleWindow::Leading {
            width_ms: self.memory_idle_ms,
        }
    }

    /// Idle window of power traces.
    pub fn power_window(&self) -> IdleWindow {
        IdleWindow::LeadingTrailing {
            width_ms: self.power_idle_ms,
        }
    }

    /// Validated gap policy.
    pub fn gap_policy(&self) -> Result<GapPolicy> {
        GapPolicy::new(self.gap_threshold_ms, self.gap_margin_ms)
            .with_context(|| format!("Invalid gap settings in {SETTINGS_FILE}"))
    }
}
