//! Progress output for flexplot runs.
//!
//! The level comes from `verbosity` in `flexplot.toml`:
//! - **Quiet**: failures and the final summary only
//! - **Default**: one line per experiment and per figure
//! - **Verbose**: also per-configuration lines and stage timings

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use serde::Deserialize;

/// How much progress flexplot prints to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Failures and the final table only.
    Quiet = 0,
    /// Per-experiment progress.
    #[default]
    Default = 1,
    /// Per-configuration progress and timings.
    Verbose = 2,
}

impl Verbosity {
    /// Log filter used when `RUST_LOG` is unset.
    pub fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Default => "warn",
            Self::Verbose => "debug",
        }
    }
}

/// Stored as the `Verbosity` discriminant; `main` writes it before processing.
static VERBOSITY: AtomicU8 = AtomicU8::new(Verbosity::Default as u8);

/// Apply the level read from settings.
pub fn init(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

/// Level applied by [`init`], `Default` before that.
pub fn verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        2 => Verbosity::Verbose,
        _ => Verbosity::Default,
    }
}

/// Whether per-configuration lines are printed.
pub fn is_verbose() -> bool {
    verbosity() == Verbosity::Verbose
}

/// Whether progress lines are suppressed.
pub fn is_quiet() -> bool {
    verbosity() == Verbosity::Quiet
}

/// `println!` for per-configuration detail.
macro_rules! vprintln {
    ($($arg:tt)*) => {
        if $crate::verbose::is_verbose() {
            println!($($arg)*);
        }
    };
}

pub(crate) use vprintln;

/// `println!` for experiment and figure progress; silent when quiet.
macro_rules! dprintln {
    ($($arg:tt)*) => {
        if !$crate::verbose::is_quiet() {
            println!($($arg)*);
        }
    };
}

pub(crate) use dprintln;

/// Reports how long an experiment took once it goes out of scope.
///
/// Only printed at `Verbose`, e.g. `  end2end: 41.8ms`.
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    /// Start the clock for `label`.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if is_verbose() {
            let elapsed = self.start.elapsed();
            println!("  {}: {:.1?}", self.label, elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_round_trips_every_level() {
        for level in [Verbosity::Quiet, Verbosity::Verbose, Verbosity::Default] {
            init(level);
            assert_eq!(verbosity(), level);
        }
        assert!(!is_quiet() && !is_verbose());
    }
}
