//! Run manifest: which configurations exist and where their inputs live.
//!
//! The telemetry library never looks at file names. Everything it needs to
//! know about a run arrives here as an explicit [`ConfigId`] plus input paths,
//! either written out in `flexplot.toml` or discovered from the directory
//! layout the benchmark harness produces:
//!
//! ```text
//! ablation/<model>_<budget bytes>/<setting>.txt
//! adaption/time.csv, adaption/mem.csv
//! end2end/flexnn/<..model..>_<budget>M.txt
//! end2end/baselines/<model>_<variant>_latency.txt, <model>_<variant>_mem.csv
//! overhead/<model>_<setting>_power.csv
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flexnn_telemetry::{ConfigId, Experiment};
use log::warn;
use serde::Deserialize;

use crate::config::Settings;
use crate::verbose::vprintln;

/// Model name given to the single adaptive run.
pub const ADAPTIVE_MODEL: &str = "adaptive";

/// A `[[run]]` table of `flexplot.toml`. Paths are relative to the results root.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunEntry {
    /// Owning experiment.
    pub experiment: Experiment,
    /// Model name.
    pub model: String,
    /// Runtime setting or baseline variant.
    pub setting: String,
    /// Memory budget in MB.
    pub budget_mb: Option<u64>,
    /// Iteration log.
    pub latency_log: Option<PathBuf>,
    /// Memory trace.
    pub memory_trace: Option<PathBuf>,
    /// Power trace.
    pub power_trace: Option<PathBuf>,
    /// Latency interval trace.
    pub intervals: Option<PathBuf>,
}

/// One configuration and its input files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    /// Configuration identity.
    pub id: ConfigId,
    /// Iteration log.
    pub latency_log: Option<PathBuf>,
    /// Memory trace.
    pub memory_trace: Option<PathBuf>,
    /// Power trace.
    pub power_trace: Option<PathBuf>,
    /// Latency interval trace.
    pub intervals: Option<PathBuf>,
}

impl Run {
    fn new(id: ConfigId) -> Self {
        Self {
            id,
            latency_log: None,
            memory_trace: None,
            power_trace: None,
            intervals: None,
        }
    }
}

/// Every run of a results root, grouped by experiment in reporting order.
#[derive(Debug, Default)]
pub struct Manifest {
    /// Runs in processing order.
    pub runs: Vec<Run>,
}

impl Manifest {
    /// Manifest from explicit settings entries, or discovered from `root`.
    pub fn resolve(root: &Path, settings: &Settings) -> Result<Self> {
        if settings.runs.is_empty() {
            Self::discover(root, settings)
        } else {
            Ok(Self::from_entries(root, &settings.runs))
        }
    }

    /// Manifest from `[[run]]` entries.
    pub fn from_entries(root: &Path, entries: &[RunEntry]) -> Self {
        let resolve = |p: &Option<PathBuf>| p.as_ref().map(|p| root.join(p));
        let mut runs: Vec<Run> = entries
            .iter()
            .map(|e| {
                let mut id = ConfigId::new(e.experiment, e.model.clone(), e.setting.clone());
                if let Some(mb) = e.budget_mb {
                    id = id.with_budget_mb(mb);
                }
                Run {
                    id,
                    latency_log: resolve(&e.latency_log),
                    memory_trace: resolve(&e.memory_trace),
                    power_trace: resolve(&e.power_trace),
                    intervals: resolve(&e.intervals),
                }
            })
            .collect();
        // Stable: entries keep their written order within an experiment.
        runs.sort_by_key(|r| r.id.experiment);
        Self { runs }
    }

    /// Manifest from the harness directory layout.
    pub fn discover(root: &Path, settings: &Settings) -> Result<Self> {
        let mut runs = Vec::new();
        discover_ablation(root, settings, &mut runs)?;
        discover_adaption(root, settings, &mut runs);
        discover_end2end(root, settings, &mut runs)?;
        discover_overhead(root, &mut runs)?;
        Ok(Self { runs })
    }

    /// Runs of `experiment`.
    pub fn experiment(&self, experiment: Experiment) -> impl Iterator<Item = &Run> {
        self.runs.iter().filter(move |r| r.id.experiment == experiment)
    }

    /// Whether no run was found.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Sorted entries of `dir`, or nothing if it does not exist.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        paths.push(entry?.path());
    }
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// `<model>_<budget bytes>` ablation directories.
fn discover_ablation(root: &Path, settings: &Settings, runs: &mut Vec<Run>) -> Result<()> {
    let mut groups: Vec<(String, u64, PathBuf)> = Vec::new();
    for dir in sorted_entries(&root.join("ablation"))? {
        if !dir.is_dir() {
            continue;
        }
        let Some(name) = file_name(&dir) else { continue };
        match name.rsplit_once('_').and_then(|(m, b)| Some((m, b.parse::<u64>().ok()?))) {
            Some((model, bytes)) => groups.push((model.to_string(), bytes, dir.clone())),
            None => warn!("ablation directory `{name}` is not <model>_<budget bytes>; skipped"),
        }
    }
    groups.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));

    for (model, bytes, dir) in groups {
        for setting in &settings.ablation_settings {
            let mut run =
                Run::new(ConfigId::new(Experiment::Ablation, model.clone(), setting.clone()).with_budget_bytes(bytes));
            run.latency_log = Some(dir.join(format!("{setting}.txt")));
            vprintln!("  found {}", run.id);
            runs.push(run);
        }
    }
    Ok(())
}

fn discover_adaption(root: &Path, settings: &Settings, runs: &mut Vec<Run>) {
    let dir = root.join("adaption");
    if !dir.is_dir() {
        return;
    }
    let mut run = Run::new(ConfigId::new(
        Experiment::Adaption,
        ADAPTIVE_MODEL,
        settings.sweep_setting.clone(),
    ));
    run.intervals = Some(dir.join("time.csv"));
    run.memory_trace = Some(dir.join("mem.csv"));
    vprintln!("  found {}", run.id);
    runs.push(run);
}

/// Budget of a sweep log named `<..>_<N>M.txt`.
fn sweep_budget(name: &str) -> Option<(&str, u64)> {
    let stem = name.strip_suffix(".txt")?;
    let (prefix, budget) = stem.rsplit_once('_')?;
    Some((prefix, budget.strip_suffix('M')?.parse().ok()?))
}

fn discover_end2end(root: &Path, settings: &Settings, runs: &mut Vec<Run>) -> Result<()> {
    let sweep_files = sorted_entries(&root.join("end2end").join(&settings.sweep_setting))?;
    let baselines_dir = root.join("end2end").join("baselines");

    for model in &settings.end2end_models {
        let mut model_runs = Vec::new();

        for path in &sweep_files {
            let Some(name) = file_name(path) else { continue };
            let Some((prefix, budget_mb)) = sweep_budget(name) else { continue };
            if !prefix.contains(model.as_str()) {
                continue;
            }
            let mut run = Run::new(
                ConfigId::new(Experiment::End2end, model.clone(), settings.sweep_setting.clone()).with_budget_mb(budget_mb),
            );
            run.latency_log = Some(path.clone());
            model_runs.push(run);
        }

        let mut any_baseline = false;
        let mut baseline_runs = Vec::new();
        for variant in &settings.end2end_baselines {
            let latency = baselines_dir.join(format!("{model}_{variant}_latency.txt"));
            let memory = baselines_dir.join(format!("{model}_{variant}_mem.csv"));
            any_baseline |= latency.exists() || memory.exists();
            let mut run = Run::new(ConfigId::new(Experiment::End2end, model.clone(), variant.clone()));
            run.latency_log = Some(latency);
            run.memory_trace = Some(memory);
            baseline_runs.push(run);
        }

        // A model with no file at all is not part of this results root.
        if model_runs.is_empty() && !any_baseline {
            vprintln!("  no end2end results for {model}");
            continue;
        }
        model_runs.extend(baseline_runs);
        for run in &model_runs {
            vprintln!("  found {}", run.id);
        }
        runs.extend(model_runs);
    }
    Ok(())
}

/// `<model>_<setting>_power.csv` traces.
fn discover_overhead(root: &Path, runs: &mut Vec<Run>) -> Result<()> {
    for path in sorted_entries(&root.join("overhead"))? {
        let Some(name) = file_name(&path) else { continue };
        let Some((model, setting)) = name
            .strip_suffix("_power.csv")
            .and_then(|stem| stem.rsplit_once('_'))
        else {
            continue;
        };
        let mut run = Run::new(ConfigId::new(Experiment::Overhead, model, setting));
        run.power_trace = Some(path.clone());
        vprintln!("  found {}", run.id);
        runs.push(run);
    }
    Ok(())
}
