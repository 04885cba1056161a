//! Command-line interface definition for flexplot.

use std::path::PathBuf;

use clap::Parser;

/// Summaries and figures from flexnn benchmark results.
///
/// Reads the results tree written by the benchmark harness and writes
/// figures plus `summary.json` under its figures directory. Tunables and an
/// optional explicit run manifest live in `<RESULTS_ROOT>/flexplot.toml`.
#[derive(Parser)]
#[command(name = "flexplot", version, about)]
pub struct Cli {
    /// Results root produced by the benchmark harness.
    pub results_root: PathBuf,
}
