//! Logging setup.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: standard tracing filter (e.g. `info`, `oceanbook=debug`);
//!   takes precedence over the configured level
//! - `LOG_FORMAT`: `pretty` (default), `compact` or `json`
//! - `LOG_LEVEL`: fallback level when `RUST_LOG` is unset

use std::env;

use serde::Deserialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, multi-line
    #[default]
    Pretty,
    /// Single line per event
    Compact,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// Unknown names fall back to `Pretty`
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Default filter directive, used when `RUST_LOG` is not set
    pub level: String,
    /// Include the module path of each event
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            level: "info".to_string(),
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Read `LOG_FORMAT` and `LOG_LEVEL`
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Override fields with whatever `LOG_FORMAT` / `LOG_LEVEL` provide
    pub fn merge_env(mut self) -> Self {
        if let Ok(format) = env::var("LOG_FORMAT") {
            self.format = LogFormat::parse(&format);
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            self.level = level;
        }
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let registry = tracing_subscriber::registry().with(config.filter());

    match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(config.include_target))
            .try_init()?,
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(config.include_target))
            .try_init()?,
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(config.include_target))
            .try_init()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("whatever"), LogFormat::Pretty);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LogConfig = toml::from_str(r#"format = "json""#).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
        assert!(config.include_target);
    }
}
