//! Logging setup for the `recast` binary.
//!
//! Console output goes to stderr so that prompts on stdout stay readable.
//! With `--log-file` every event is also appended, without colors, to a file.
//!
//! `RUST_LOG` overrides the verbosity given on the command line.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Configuration for logging behavior
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    /// Include the module path in console output
    pub with_target: bool,
    pub with_ansi: bool,
    /// Append the full trail to this file as well
    pub log_file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            with_target: false,
            with_ansi: true,
            log_file: None,
        }
    }
}

impl LogConfig {
    /// `-v` count to level: none is info, one is debug, more is trace
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    pub fn with_ansi(mut self, enable: bool) -> Self {
        self.with_ansi = enable;
        self
    }
}

/// Install the global subscriber. Call once, at startup.
///
/// Fails if the log file cannot be opened.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    let file = match &config.log_file {
        Some(path) => Some(OpenOptions::new().create(true).append(true).open(path)?),
        None => None,
    };
    let file_layer = file.map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
    });

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.with_ansi)
        .with_target(config.with_target)
        .without_time();

    // a subscriber may already be installed
    let _ = tracing_subscriber::registry()
        .with(build_env_filter(config.level))
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(())
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        // dependencies stay at warn
        EnvFilter::new(format!("warn,recast={level}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_verbosity() {
        assert_eq!(LogConfig::from_verbosity(0).level, Level::INFO);
        assert_eq!(LogConfig::from_verbosity(1).level, Level::DEBUG);
        assert_eq!(LogConfig::from_verbosity(3).level, Level::TRACE);
    }

    #[test]
    fn test_log_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recast.log");
        let config = LogConfig::default()
            .with_ansi(false)
            .with_log_file(Some(path.clone()));

        init_logging(&config).unwrap();
        assert!(path.exists());
    }
}
