//! Log level selection and subscriber setup

use tracing::Level;

/// Log level for CLI output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Errors only
    Quiet,
    /// Progress and results
    #[default]
    Normal,
    /// Per-episode details
    Verbose,
}

impl LogLevel {
    /// `--quiet` wins over `--verbose`
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    pub fn max_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
        }
    }
}

/// Install the global fmt subscriber; a no-op if one is already installed
pub fn init_logging(level: LogLevel) {
    let installed = tracing_subscriber::fmt()
        .with_max_level(level.max_level())
        .with_target(false)
        .try_init()
        .is_ok();
    if !installed {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Print a message if the current level permits it
pub fn log(level: LogLevel, required: LogLevel, msg: &str) {
    if level != LogLevel::Quiet && (level == required || required == LogLevel::Normal) {
        println!("{msg}");
    }
}
