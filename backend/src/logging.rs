//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! # Log Levels
//!
//! - `warn`: dropped rows, bad suffixes, unparseable dates, unknown answers
//! - `info`: pipeline stage progress and summary counts
//! - `debug`: per-row and per-file details
//!
//! `RUST_LOG` overrides the level chosen on the command line.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Configuration for logging behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: Level,
    /// Whether to use ANSI colors in output.
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            with_ansi: true,
        }
    }
}

impl LogConfig {
    /// Info level, or debug when `debug` is set.
    #[must_use]
    pub fn from_debug_flag(debug: bool) -> Self {
        Self {
            level: if debug { Level::DEBUG } else { Level::INFO },
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_ansi(mut self, enable: bool) -> Self {
        self.with_ansi = enable;
        self
    }
}

/// Install the global subscriber writing to stderr.
///
/// Call once at startup. A second call leaves the first subscriber in place.
pub fn init_logging(config: &LogConfig) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.with_ansi)
        .with_target(false)
        .without_time();

    let _ = tracing_subscriber::registry()
        .with(build_env_filter(config.level))
        .with(layer)
        .try_init();
}

/// Build an `EnvFilter` from the given level, respecting `RUST_LOG`.
fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Other crates stay at warn
        EnvFilter::new(format!(
            "warn,surveymeta={level}",
            level = level.as_str().to_lowercase()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_debug_flag() {
        assert_eq!(LogConfig::from_debug_flag(false).level, Level::INFO);
        assert_eq!(LogConfig::from_debug_flag(true).level, Level::DEBUG);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LogConfig::default().with_ansi(false);
        init_logging(&config);
        init_logging(&config);
    }
}
