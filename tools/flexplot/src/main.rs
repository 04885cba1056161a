//! flexnn results post-processing.
//!
//! Pipeline: load flexplot.toml → build the run manifest → reduce every run
//!           to a configuration → build figures → render SVGs → write the
//!           JSON summary and print the table.

mod cli;
mod config;
mod manifest;
mod output;
mod pipeline;
mod render;
mod summary;
mod verbose;

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::Parser;
use flexnn_telemetry::{
    Aggregate, AblationFigure, BudgetFigure, Experiment, PowerFigure, RenderContext, Renderer, TimelineFigure,
};
use log::warn;

use config::Settings;
use manifest::Manifest;
use render::SvgRenderer;
use verbose::{Timer, dprintln};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let root = cli.results_root.as_path();
    if !root.is_dir() {
        bail!("results root {} does not exist", root.display());
    }

    let settings = Settings::load(root)?;
    verbose::init(settings.verbosity);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(verbose::verbosity().log_filter()))
        .init();

    let manifest = {
        let _t = Timer::start("manifest");
        Manifest::resolve(root, &settings)?
    };
    if manifest.is_empty() {
        bail!("no benchmark results found under {}", root.display());
    }
    dprintln!("Found {} configurations in {}", manifest.runs.len(), root.display());

    let aggregate = pipeline::process_all(&manifest, &settings)?.finish();

    let figures_dir = settings.figures_root(root);
    let figures = render_figures(&aggregate, &settings, &figures_dir);
    summary::save_summary(&aggregate, &figures, &figures_dir)?;

    if !verbose::is_quiet() || !aggregate.failures().is_empty() {
        output::print_table(&aggregate);
    }

    if aggregate.configurations().is_empty() {
        bail!("all {} configurations failed", aggregate.failures().len());
    }
    Ok(())
}

/// Render every figure with data; a figure that fails to draw is skipped.
fn render_figures(aggregate: &Aggregate, settings: &Settings, figures_dir: &Path) -> Vec<PathBuf> {
    let _t = Timer::start("figures");
    let ctx = RenderContext::new(figures_dir, (settings.canvas[0], settings.canvas[1]));
    let renderer = SvgRenderer;
    let mut produced = Vec::new();
    let mut keep = |name: &str, result: Result<PathBuf>| match result {
        Ok(path) => {
            dprintln!("Wrote {}", path.display());
            produced.push(path);
        }
        Err(err) => warn!("figure {name} not drawn: {err:#}"),
    };

    let ablation = AblationFigure::build(aggregate, &settings.ablation_settings);
    if !ablation.is_empty() {
        keep("ablation", renderer.ablation(&ctx, &ablation));
    }

    if let Some(config) = aggregate.experiment(Experiment::Adaption).next() {
        match TimelineFigure::build(config) {
            Some(timeline) => keep("adaption", renderer.timeline(&ctx, &timeline)),
            None => warn!("{}: no latency or memory series to draw", config.id),
        }
    }

    for model in aggregate.models(Experiment::End2end) {
        if let Some(figure) = BudgetFigure::build(aggregate, model, &settings.sweep_setting) {
            keep(model, renderer.budget(&ctx, &figure));
        }
    }

    let power = PowerFigure::build(aggregate);
    if !power.traces.is_empty() {
        keep("power", renderer.power(&ctx, &power));
    }

    produced
}
