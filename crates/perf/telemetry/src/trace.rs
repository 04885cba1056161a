//! CSV trace loading.
//!
//! Traces are CSV files with a header row. The columns a trace kind needs are
//! looked up once in the header; a missing column fails the whole load before
//! any row is read. Every row is then parsed by column index.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::{Error, Result, read_input};
use crate::gaps::Interval;
use crate::series::{Sample, Series};

/// Timestamp column shared by memory and power traces.
pub const TIMESTAMP_COLUMN: &str = "timestamp(ms)";
/// Interval start column.
pub const START_COLUMN: &str = "start(ms)";
/// Interval end column.
pub const END_COLUMN: &str = "end(ms)";

/// Value column carried by a sampled trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    /// Resident memory in kB.
    Memory,
    /// Power draw in mW.
    Power,
}

impl TraceKind {
    /// Header of the value column.
    pub const fn value_column(self) -> &'static str {
        match self {
            Self::Memory => "memory(kB)",
            Self::Power => "power(mW)",
        }
    }
}

/// Column indices resolved from a header row.
struct Schema<const N: usize> {
    names: [&'static str; N],
    indices: [usize; N],
}

impl<const N: usize> Schema<N> {
    fn resolve(headers: &StringRecord, names: [&'static str; N]) -> Result<Self> {
        let mut indices = [0; N];
        for (slot, name) in indices.iter_mut().zip(names) {
            *slot = headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| Error::malformed_trace(format!("missing column `{name}`")))?;
        }
        Ok(Self { names, indices })
    }

    fn parse(&self, record: &StringRecord, row: usize) -> Result<[f64; N]> {
        let mut values = [0.0; N];
        for ((value, &idx), name) in values.iter_mut().zip(&self.indices).zip(self.names) {
            let cell = record.get(idx).ok_or_else(|| {
                Error::malformed_trace(format!("row {row}: no value for `{name}`"))
            })?;
            *value = cell
                .parse()
                .ok()
                .filter(|v: &f64| v.is_finite())
                .ok_or_else(|| {
                    Error::malformed_trace(format!("row {row}: `{name}` value `{cell}` is not a finite number"))
                })?;
        }
        Ok(values)
    }
}

fn read_rows<const N: usize>(reader: impl Read, names: [&'static str; N]) -> Result<Vec<[f64; N]>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(Error::malformed_trace)?.clone();
    let schema = Schema::resolve(&headers, names)?;

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        // Data rows start on line 2, after the header.
        let row = idx + 2;
        let record = record.map_err(|e| Error::malformed_trace(format!("row {row}: {e}")))?;
        rows.push(schema.parse(&record, row)?);
    }
    Ok(rows)
}

/// Parse a memory or power trace into a timestamp-ordered series.
pub fn parse_trace(reader: impl Read, kind: TraceKind) -> Result<Series> {
    let rows = read_rows(reader, [TIMESTAMP_COLUMN, kind.value_column()])?;
    Ok(Series::new(rows.into_iter().map(|[t, v]| Sample::new(t, v)).collect()))
}

/// Load a memory or power trace from `path`.
pub fn load_trace(path: &Path, kind: TraceKind) -> Result<Series> {
    let text = read_input(path)?;
    parse_trace(text.as_bytes(), kind).map_err(|e| e.in_file(path))
}

/// Parse a latency interval trace, stably ordered by start time.
pub fn parse_intervals(reader: impl Read) -> Result<Vec<Interval>> {
    let rows = read_rows(reader, [START_COLUMN, END_COLUMN])?;
    let mut intervals = Vec::with_capacity(rows.len());
    for (idx, [start_ms, end_ms]) in rows.into_iter().enumerate() {
        if end_ms < start_ms {
            return Err(Error::malformed_trace(format!(
                "row {}: interval ends ({end_ms}) before it starts ({start_ms})",
                idx + 2
            )));
        }
        intervals.push(Interval { start_ms, end_ms });
    }
    intervals.sort_by(|a, b| a.start_ms.total_cmp(&b.start_ms));
    Ok(intervals)
}

/// Load a latency interval trace from `path`.
pub fn load_intervals(path: &Path) -> Result<Vec<Interval>> {
    let text = read_input(path)?;
    parse_intervals(text.as_bytes()).map_err(|e| e.in_file(path))
}
