use std::sync::atomic::{AtomicU8, Ordering};
use tracing_subscriber::EnvFilter;

/// Output level chosen on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    /// `--quiet` wins over `--verbose`
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Default filter directive when `RUST_LOG` is unset
    pub fn filter_directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Verbosity::Quiet,
            2 => Verbosity::Verbose,
            _ => Verbosity::Normal,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Verbosity::Quiet => 0,
            Verbosity::Normal => 1,
            Verbosity::Verbose => 2,
        }
    }
}

static VERBOSITY: AtomicU8 = AtomicU8::new(1);

pub fn verbosity() -> Verbosity {
    Verbosity::from_u8(VERBOSITY.load(Ordering::Relaxed))
}

pub fn is_quiet() -> bool {
    verbosity() == Verbosity::Quiet
}

/// Records the verbosity and installs the stderr subscriber derived from it.
/// `RUST_LOG` takes precedence for log filtering only; `status!` output
/// follows the flags.
///
/// Calling it again is harmless; only the first subscriber sticks.
pub fn init(quiet: bool, verbose: bool) {
    let level = Verbosity::from_flags(quiet, verbose);
    VERBOSITY.store(level.as_u8(), Ordering::Relaxed);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.filter_directive()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Prints user-facing output unless `--quiet` was given
#[macro_export]
macro_rules! status {
    ($($arg:tt)*) => {
        if !$crate::logger::is_quiet() {
            println!($($arg)*);
        }
    };
}
