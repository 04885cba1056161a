//! Turns one manifest run into a [`Configuration`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use flexnn_telemetry::figure::{LATENCY_SERIES, MEMORY_SERIES, POWER_SERIES};
use flexnn_telemetry::{
    ConfigAggregator, Configuration, Experiment, LatencyExtraction, TraceKind, insert_gap_anchors, integrate_energy,
    latency_series, load_intervals, load_trace, peak_delta, subtract_idle_baseline,
};
use log::debug;

use crate::config::Settings;
use crate::manifest::{Manifest, Run};
use crate::verbose::{Timer, dprintln, vprintln};

/// Process every run of `manifest`, isolating failures per configuration.
pub fn process_all(manifest: &Manifest, settings: &Settings) -> Result<ConfigAggregator> {
    let gaps = settings.gap_policy()?;
    let ablation = settings.ablation_extraction();
    let end2end = settings.end2end_extraction();
    let stages = Stages {
        settings,
        gaps: &gaps,
        ablation: &ablation,
        end2end: &end2end,
    };

    let mut aggregator = ConfigAggregator::new();
    for experiment in Experiment::ALL {
        let runs: Vec<&Run> = manifest.experiment(experiment).collect();
        if runs.is_empty() {
            continue;
        }
        let _t = Timer::start(experiment.name());
        dprintln!("Processing {experiment} ({} configurations)", runs.len());
        for run in runs {
            match stages.process(run) {
                Ok(config) => {
                    vprintln!("  {}: ok", run.id);
                    aggregator.record(config);
                }
                Err(err) => {
                    aggregator.record_failure(run.id.clone(), err);
                }
            }
        }
    }
    Ok(aggregator)
}

/// Per-run processing stages, sharing validated settings.
struct Stages<'a> {
    settings: &'a Settings,
    gaps: &'a flexnn_telemetry::GapPolicy,
    ablation: &'a LatencyExtraction,
    end2end: &'a LatencyExtraction,
}

fn required<'p>(path: Option<&'p PathBuf>, what: &str) -> Result<&'p Path> {
    match path {
        Some(p) => Ok(p.as_path()),
        None => bail!("no {what} configured"),
    }
}

impl Stages<'_> {
    fn process(&self, run: &Run) -> Result<Configuration> {
        let config = Configuration::new(run.id.clone());
        match run.id.experiment {
            Experiment::Ablation => self.latency(run, self.ablation, config),
            Experiment::End2end => {
                let config = self.latency(run, self.end2end, config)?;
                // Sweep points plot at their budget; only baselines carry a peak.
                match (&run.id.memory_budget_bytes, &run.memory_trace) {
                    (None, Some(path)) => self.peak_memory(path, config),
                    _ => Ok(config),
                }
            }
            Experiment::Adaption => self.adaption(run, config),
            Experiment::Overhead => self.overhead(run, config),
        }
    }

    fn latency(&self, run: &Run, extraction: &LatencyExtraction, config: Configuration) -> Result<Configuration> {
        let path = required(run.latency_log.as_ref(), "latency log")?;
        let summary = extraction.summarize_file(path)?;
        debug!(
            "{}: mean {:.3} ms over {} of {} samples",
            run.id, summary.mean_ms, summary.kept, summary.candidates
        );
        Ok(config.with_latency(summary))
    }

    fn peak_memory(&self, path: &Path, config: Configuration) -> Result<Configuration> {
        let trace = load_trace(path, TraceKind::Memory)?;
        let peak = peak_delta(&trace, self.settings.memory_window())
            .with_context(|| format!("memory baseline of {}", path.display()))?;
        Ok(config.with_peak_memory(peak))
    }

    fn adaption(&self, run: &Run, config: Configuration) -> Result<Configuration> {
        let intervals = load_intervals(required(run.intervals.as_ref(), "interval trace")?)?;
        let anchored = insert_gap_anchors(&intervals, self.gaps);
        debug!("{}: {} intervals, {} after anchoring", run.id, intervals.len(), anchored.len());

        let path = required(run.memory_trace.as_ref(), "memory trace")?;
        let memory = subtract_idle_baseline(&load_trace(path, TraceKind::Memory)?, self.settings.memory_window())
            .with_context(|| format!("memory baseline of {}", path.display()))?;
        let peak = memory
            .series()
            .max_value()
            .with_context(|| format!("memory trace {} has no samples", path.display()))?;

        Ok(config
            .with_peak_memory(peak)
            .with_series(LATENCY_SERIES, latency_series(&anchored))
            .with_series(MEMORY_SERIES, memory.into_series()))
    }

    fn overhead(&self, run: &Run, config: Configuration) -> Result<Configuration> {
        let path = required(run.power_trace.as_ref(), "power trace")?;
        let power = subtract_idle_baseline(&load_trace(path, TraceKind::Power)?, self.settings.power_window())
            .with_context(|| format!("power baseline of {}", path.display()))?;
        let energy = integrate_energy(&power).with_context(|| format!("energy of {}", path.display()))?;
        debug!(
            "{}: baseline {:.1} mW, {:.3} mJ over {:.0} ms",
            run.id,
            power.baseline(),
            energy.energy_mj,
            energy.duration_ms
        );
        Ok(config
            .with_energy(energy)
            .with_series(POWER_SERIES, power.into_series()))
    }
}

#[cfg(test)]
mod tests {
    use flexnn_telemetry::ConfigId;

    use super::*;

    fn run(id: ConfigId) -> Run {
        Run {
            id,
            latency_log: None,
            memory_trace: None,
            power_trace: None,
            intervals: None,
        }
    }

    #[test]
    fn baseline_run_reports_peak_memory() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("vgg19_default_latency.txt");
        let mem = dir.path().join("vgg19_default_mem.csv");
        std::fs::write(&log, "loop 10 ms\nloop 1 ms\nloop 20 ms\nloop 12 ms\n").unwrap();
        std::fs::write(&mem, "timestamp(ms),memory(kB)\n0,1000\n4000,9000\n").unwrap();

        let mut r = run(ConfigId::new(Experiment::End2end, "vgg19", "default"));
        r.latency_log = Some(log);
        r.memory_trace = Some(mem);
        let manifest = Manifest { runs: vec![r] };
        let agg = process_all(&manifest, &Settings::default()).unwrap().finish();
        let config = &agg.configurations()[0];
        assert_eq!(config.metrics.mean_latency_ms(), Some(11.0));
        assert_eq!(config.metrics.peak_memory_kb, Some(8000.0));
    }

    #[test]
    fn missing_input_becomes_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut r = run(ConfigId::new(Experiment::Overhead, "vgg19", "ncnn"));
        r.power_trace = Some(dir.path().join("vgg19_ncnn_power.csv"));
        let manifest = Manifest { runs: vec![r] };
        let agg = process_all(&manifest, &Settings::default()).unwrap().finish();
        assert!(agg.configurations().is_empty());
        assert!(agg.failures()[0].error.contains("vgg19_ncnn_power.csv"));
    }

    #[test]
    fn adaption_without_memory_samples_fails_instead_of_reporting_zero() {
        let dir = tempfile::tempdir().unwrap();
        let intervals = dir.path().join("time.csv");
        let mem = dir.path().join("mem.csv");
        std::fs::write(&intervals, "start(ms),end(ms)\n0,10\n200,210\n").unwrap();
        std::fs::write(&mem, "timestamp(ms),memory(kB)\n").unwrap();

        let mut r = run(ConfigId::new(Experiment::Adaption, "adaptive", "flexnn"));
        r.intervals = Some(intervals);
        r.memory_trace = Some(mem);
        let manifest = Manifest { runs: vec![r] };
        let agg = process_all(&manifest, &Settings::default()).unwrap().finish();
        assert!(agg.configurations().is_empty());
        assert!(agg.failures()[0].error.contains("mem.csv"), "{}", agg.failures()[0].error);
    }

    #[test]
    fn unconfigured_input_is_reported() {
        let manifest = Manifest {
            runs: vec![run(ConfigId::new(Experiment::Adaption, "adaptive", "flexnn"))],
        };
        let agg = process_all(&manifest, &Settings::default()).unwrap().finish();
        assert!(agg.failures()[0].error.contains("no interval trace configured"));
    }
}
