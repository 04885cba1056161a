//! SVG figures drawn with plotters.

use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flexnn_telemetry::figure::{AblationFigure, BudgetFigure, PowerFigure, RenderContext, Renderer, TimelineFigure};
use flexnn_telemetry::{Experiment, Series};
use plotters::prelude::*;

const FONT: &str = "sans-serif";
const CAPTION_SIZE: u32 = 22;
const BAR_GROUP_WIDTH: f64 = 0.8;

/// Draws figures as SVG files under the render context's figure tree.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgRenderer;

impl Renderer for SvgRenderer {
    type Error = anyhow::Error;

    fn ablation(&self, ctx: &RenderContext, figure: &AblationFigure) -> Result<PathBuf> {
        let path = ctx.figure_path(Experiment::Ablation, "ablation.svg")?;
        draw_ablation(&path, ctx.size(), figure).with_context(|| format!("drawing {}", path.display()))?;
        Ok(path)
    }

    fn budget(&self, ctx: &RenderContext, figure: &BudgetFigure) -> Result<PathBuf> {
        let path = ctx.figure_path(Experiment::End2end, &format!("{}.svg", figure.model))?;
        draw_budget(&path, ctx.size(), figure).with_context(|| format!("drawing {}", path.display()))?;
        Ok(path)
    }

    fn timeline(&self, ctx: &RenderContext, figure: &TimelineFigure) -> Result<PathBuf> {
        let path = ctx.figure_path(Experiment::Adaption, "adaption.svg")?;
        draw_timeline(&path, ctx.size(), figure).with_context(|| format!("drawing {}", path.display()))?;
        Ok(path)
    }

    fn power(&self, ctx: &RenderContext, figure: &PowerFigure) -> Result<PathBuf> {
        let path = ctx.figure_path(Experiment::Overhead, "power.svg")?;
        draw_power(&path, ctx.size(), figure).with_context(|| format!("drawing {}", path.display()))?;
        Ok(path)
    }
}

/// Padded axis range covering `values`, starting at zero when `from_zero`.
fn axis_range(values: impl IntoIterator<Item = f64>, from_zero: bool) -> Range<f64> {
    let (mut lo, mut hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return 0.0..1.0;
    }
    if from_zero {
        lo = lo.min(0.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        hi = lo + 1.0;
    }
    let pad = (hi - lo) * 0.05;
    (if from_zero && lo >= 0.0 { lo } else { lo - pad })..hi + pad
}

fn color(index: usize) -> RGBAColor {
    Palette99::pick(index).to_rgba()
}

fn series_points(series: &Series) -> impl Iterator<Item = (f64, f64)> + '_ {
    series.samples().iter().map(|s| (s.timestamp_ms, s.value))
}

fn draw_ablation(path: &Path, size: (u32, u32), figure: &AblationFigure) -> Result<()> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let groups = figure.groups.len();
    let y_range = axis_range(
        figure.groups.iter().flat_map(|g| g.latencies_ms.iter().flatten().copied()),
        true,
    );
    let labels: Vec<&str> = figure.groups.iter().map(|g| g.label.as_str()).collect();
    let label_at = |x: &f64| {
        let idx = x.round();
        if (x - idx).abs() > 1e-6 || idx < 0.0 {
            return String::new();
        }
        labels.get(idx as usize).map(ToString::to_string).unwrap_or_default()
    };

    let mut chart = ChartBuilder::on(&root)
        .caption("Ablation", (FONT, CAPTION_SIZE))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..groups as f64 - 0.5, y_range)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(groups.max(1))
        .x_label_formatter(&label_at)
        .y_desc("Latency (ms)")
        .draw()?;

    let bar_width = BAR_GROUP_WIDTH / figure.settings.len().max(1) as f64;
    for (s, setting) in figure.settings.iter().enumerate() {
        let fill = color(s);
        let bars = figure.groups.iter().enumerate().filter_map(|(g, group)| {
            let latency = group.latencies_ms.get(s).copied().flatten()?;
            let x0 = g as f64 - BAR_GROUP_WIDTH / 2.0 + s as f64 * bar_width;
            Some(Rectangle::new([(x0, 0.0), (x0 + bar_width, latency)], fill.filled()))
        });
        chart
            .draw_series(bars)?
            .label(setting.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], fill.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

fn draw_budget(path: &Path, size: (u32, u32), figure: &BudgetFigure) -> Result<()> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let x_range = axis_range(
        figure
            .sweep
            .iter()
            .map(|p| p.0)
            .chain(figure.baselines.iter().map(|b| b.memory_mb)),
        true,
    );
    let y_range = axis_range(
        figure
            .sweep
            .iter()
            .map(|p| p.1)
            .chain(figure.baselines.iter().map(|b| b.latency_ms)),
        true,
    );

    let mut chart = ChartBuilder::on(&root)
        .caption(&figure.model, (FONT, CAPTION_SIZE))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Memory (MB)")
        .y_desc("Latency (ms)")
        .draw()?;

    let sweep_color = color(0);
    if !figure.sweep.is_empty() {
        chart
            .draw_series(LineSeries::new(figure.sweep.iter().copied(), sweep_color.stroke_width(2)))?
            .label(figure.sweep_setting.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], sweep_color.stroke_width(2)));
        chart.draw_series(
            figure
                .sweep
                .iter()
                .map(|&p| Circle::new(p, 3, sweep_color.filled())),
        )?;
    }

    for (i, baseline) in figure.baselines.iter().enumerate() {
        let marker = color(i + 1);
        chart
            .draw_series(std::iter::once(TriangleMarker::new(
                (baseline.memory_mb, baseline.latency_ms),
                7,
                marker.filled(),
            )))?
            .label(baseline.variant.as_str())
            .legend(move |(x, y)| TriangleMarker::new((x + 5, y), 6, marker.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

fn draw_timeline(path: &Path, size: (u32, u32), figure: &TimelineFigure) -> Result<()> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let x_range = axis_range(
        [figure.latency.end_ms(), figure.memory_mb.end_ms(), Some(0.0)]
            .into_iter()
            .flatten(),
        true,
    );
    let latency_range = axis_range(figure.latency.values(), true);
    let memory_range = axis_range(figure.memory_mb.values(), true);

    let mut chart = ChartBuilder::on(&root)
        .caption("Adaptive run", (FONT, CAPTION_SIZE))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .right_y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), latency_range)?
        .set_secondary_coord(x_range, memory_range);

    chart
        .configure_mesh()
        .x_desc("Time (ms)")
        .y_desc("Latency (ms)")
        .draw()?;
    chart.configure_secondary_axes().y_desc("Memory (MB)").draw()?;

    let latency_color = color(0);
    let memory_color = color(1);
    chart
        .draw_series(LineSeries::new(series_points(&figure.latency), latency_color.stroke_width(2)))?
        .label("latency")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], latency_color.stroke_width(2)));
    chart
        .draw_secondary_series(LineSeries::new(series_points(&figure.memory_mb), memory_color.stroke_width(2)))?
        .label("memory")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], memory_color.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

fn draw_power(path: &Path, size: (u32, u32), figure: &PowerFigure) -> Result<()> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let x_range = axis_range(
        figure.traces.iter().filter_map(|t| t.series.end_ms()).chain([0.0]),
        true,
    );
    let y_range = axis_range(figure.traces.iter().flat_map(|t| t.series.values()), false);

    let mut chart = ChartBuilder::on(&root)
        .caption("Power above idle", (FONT, CAPTION_SIZE))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Time (ms)")
        .y_desc("Power (mW)")
        .draw()?;

    for (i, trace) in figure.traces.iter().enumerate() {
        let line = color(i);
        chart
            .draw_series(LineSeries::new(series_points(&trace.series), line.stroke_width(2)))?
            .label(format!("{} ({:.1} mJ)", trace.label, trace.energy_mj))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_range_pads_and_starts_at_zero() {
        let r = axis_range([10.0, 20.0], true);
        assert_eq!(r.start, 0.0);
        assert!(r.end > 20.0);
    }

    #[test]
    fn axis_range_handles_degenerate_input() {
        assert_eq!(axis_range(std::iter::empty(), true), 0.0..1.0);
        let flat = axis_range([5.0, 5.0], false);
        assert!(flat.start < 5.0 && flat.end > 6.0);
    }

    #[test]
    fn negative_values_extend_below_zero() {
        let r = axis_range([-50.0, 100.0], false);
        assert!(r.start < -50.0);
    }
}
