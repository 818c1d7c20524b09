//! Logging setup
//!
//! CLI commands log to stderr. The interactive remote owns the terminal,
//! so it logs to a file under the user cache directory instead.
//! `RUST_LOG` overrides the configured level.

use std::fmt;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter};

/// Log verbosity
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    #[default]
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(anyhow!("unknown log level: {}", other)),
        }
    }
}

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// Default log file (~/.cache/rokuremote/rokuremote.log)
pub fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("rokuremote").join("rokuremote.log"))
}

/// Filter directive for a level: our crate at `level`, dependencies at warn
pub fn filter_directive(level: LogLevel) -> String {
    match level {
        LogLevel::Error => "error".to_string(),
        level => format!("warn,rokuremote={}", level),
    }
}

/// Install the global subscriber
pub fn init(level: LogLevel, target: LogTarget) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    match target {
        LogTarget::Stderr => tracing_fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .try_init()
            .map_err(|e| anyhow!("failed to install logger: {}", e)),
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            tracing_fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .try_init()
                .map_err(|e| anyhow!("failed to install logger: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive(LogLevel::Error), "error");
        assert_eq!(filter_directive(LogLevel::Debug), "warn,rokuremote=debug");
        assert_eq!(filter_directive(LogLevel::Info), "warn,rokuremote=info");
    }
}
