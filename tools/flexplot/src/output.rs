//! Terminal output formatting for processed configurations.

use flexnn_telemetry::{Aggregate, Configuration};

fn cell(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

fn samples(config: &Configuration) -> String {
    match (config.metrics.latency, config.metrics.energy) {
        (Some(l), _) => format!("{}/{}", l.kept, l.candidates),
        (None, Some(e)) => e.samples.to_string(),
        (None, None) => "-".to_string(),
    }
}

/// Print per-configuration metrics as a formatted table, followed by failures.
pub fn print_table(aggregate: &Aggregate) {
    let configs = aggregate.configurations();
    if configs.is_empty() && aggregate.failures().is_empty() {
        println!("  No configurations to display.");
        return;
    }

    let names: Vec<String> = configs.iter().map(|c| c.id.to_string()).collect();
    let max_name = names.iter().map(String::len).max().unwrap_or(13).max(13);

    // Header.
    println!();
    println!(
        "  {:<width$}  {:>12}  {:>10}  {:>14}  {:>12}",
        "Configuration",
        "Latency (ms)",
        "Samples",
        "Peak mem (kB)",
        "Energy (mJ)",
        width = max_name
    );
    println!(
        "  {:-<width$}  {:->12}  {:->10}  {:->14}  {:->12}",
        "",
        "",
        "",
        "",
        "",
        width = max_name
    );

    for (name, config) in names.iter().zip(configs) {
        println!(
            "  {:<width$}  {:>12}  {:>10}  {:>14}  {:>12}",
            name,
            cell(config.metrics.mean_latency_ms(), 3),
            samples(config),
            cell(config.metrics.peak_memory_kb, 0),
            cell(config.metrics.energy.map(|e| e.energy_mj), 3),
            width = max_name
        );
    }

    if !aggregate.failures().is_empty() {
        println!();
        println!("  Failed configurations:");
        for failure in aggregate.failures() {
            println!("    {}: {}", failure.id, failure.error);
        }
    }
    if !aggregate.duplicates().is_empty() {
        println!();
        println!("  Duplicate configurations (first result kept):");
        for id in aggregate.duplicates() {
            println!("    {id}");
        }
    }
    println!();
}
