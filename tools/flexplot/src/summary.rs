//! JSON summary of a processing pass.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flexnn_telemetry::Aggregate;
use serde::Serialize;

/// Summary file name, written into the figures directory.
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Serialize)]
struct Summary<'a> {
    figures: &'a [PathBuf],
    #[serde(flatten)]
    aggregate: &'a Aggregate,
}

/// Write `aggregate` and the produced figure paths to `dir/summary.json`.
pub fn save_summary(aggregate: &Aggregate, figures: &[PathBuf], dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(SUMMARY_FILE);
    let summary = Summary { figures, aggregate };
    let json = serde_json::to_string_pretty(&summary).context("serializing summary to JSON")?;
    std::fs::write(&path, json).with_context(|| format!("writing summary to {}", path.display()))?;
    Ok(path)
}
