//! Error type shared by every telemetry component.

use std::fmt;
use std::path::{Path, PathBuf};

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised while extracting or normalizing telemetry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No log line contained the marker token.
    #[error("no line contains the marker `{marker}`")]
    EmptyInput {
        /// Marker token that was searched for.
        marker: String,
    },

    /// An algorithm received fewer samples than it needs.
    #[error("{operation} needs at least {required} samples, got {found}")]
    InsufficientSamples {
        /// Operation that rejected the input.
        operation: &'static str,
        /// Minimum sample count.
        required: usize,
        /// Sample count that was supplied.
        found: usize,
    },

    /// A tabular trace is missing a column or has an unparseable cell.
    #[error("malformed trace: {reason}")]
    MalformedTrace {
        /// What was wrong with the trace.
        reason: String,
    },

    /// A marker line in a run log could not be turned into a latency.
    #[error("malformed log line {line}: {reason}")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// The idle window selected no samples.
    #[error("idle window ({window}) contains no samples")]
    EmptyIdleWindow {
        /// Human-readable window description.
        window: String,
    },

    /// Gap threshold and anchor margin are inconsistent.
    #[error("invalid gap policy: margin {margin_ms} ms must be in [0, {threshold_ms}/2]")]
    InvalidGapPolicy {
        /// Gap threshold in milliseconds.
        threshold_ms: f64,
        /// Anchor margin in milliseconds.
        margin_ms: f64,
    },

    /// An input file does not exist.
    #[error("file not found: {}", .path.display())]
    FileNotFound {
        /// Missing path.
        path: PathBuf,
    },

    /// An input file exists but could not be read.
    #[error("reading {}", .path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Any of the above, attributed to the file it came from.
    #[error("{}: {error}", .path.display())]
    InFile {
        /// File being processed.
        path: PathBuf,
        /// Underlying failure, rendered inline rather than as a source.
        error: Box<Error>,
    },
}

/// Discriminant of [`Error`], looking through [`Error::InFile`] wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`Error::EmptyInput`].
    EmptyInput,
    /// See [`Error::InsufficientSamples`].
    InsufficientSamples,
    /// See [`Error::MalformedTrace`].
    MalformedTrace,
    /// See [`Error::MalformedLine`].
    MalformedLine,
    /// See [`Error::EmptyIdleWindow`].
    EmptyIdleWindow,
    /// See [`Error::InvalidGapPolicy`].
    InvalidGapPolicy,
    /// See [`Error::FileNotFound`].
    FileNotFound,
    /// See [`Error::Io`].
    Io,
}

impl Error {
    /// Attribute this error to `path`.
    ///
    /// Errors that already name their path are returned unchanged.
    #[must_use]
    pub fn in_file(self, path: &Path) -> Self {
        match self {
            Self::FileNotFound { .. } | Self::Io { .. } | Self::InFile { .. } => self,
            other => Self::InFile {
                path: path.to_path_buf(),
                error: Box::new(other),
            },
        }
    }

    /// The kind of failure, ignoring file attribution.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput { .. } => ErrorKind::EmptyInput,
            Self::InsufficientSamples { .. } => ErrorKind::InsufficientSamples,
            Self::MalformedTrace { .. } => ErrorKind::MalformedTrace,
            Self::MalformedLine { .. } => ErrorKind::MalformedLine,
            Self::EmptyIdleWindow { .. } => ErrorKind::EmptyIdleWindow,
            Self::InvalidGapPolicy { .. } => ErrorKind::InvalidGapPolicy,
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::Io { .. } => ErrorKind::Io,
            Self::InFile { error, .. } => error.kind(),
        }
    }

    pub(crate) fn malformed_trace(reason: impl fmt::Display) -> Self {
        Self::MalformedTrace {
            reason: reason.to_string(),
        }
    }
}

/// Read a whole input file, mapping a missing file to [`Error::FileNotFound`].
pub(crate) fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Error::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}
