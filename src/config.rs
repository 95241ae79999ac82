//! Engine configuration, loaded from TOML.
//!
//! ```toml
//! symbols = ["BTC-USDT", "ETH-USDT"]
//! channel_capacity = 1024
//! book_capacity = 100000
//!
//! [log]
//! format = "compact"
//! level = "oceanbook=debug"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::logging::LogConfig;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// One book (and one actor) per symbol
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    /// Bounded command queue length per symbol actor
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Order slots pre-allocated per book
    #[serde(default = "default_book_capacity")]
    pub book_capacity: usize,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_symbols() -> Vec<String> {
    vec!["BTC-USDT".to_string()]
}
fn default_channel_capacity() -> usize {
    1024
}
fn default_book_capacity() -> usize {
    10_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            channel_capacity: default_channel_capacity(),
            book_capacity: default_book_capacity(),
            log: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Read and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("at least one symbol is required".into()));
        }
        let mut seen = HashSet::new();
        for symbol in &self.symbols {
            if symbol.trim().is_empty() {
                return Err(ConfigError::Invalid("symbol names must not be blank".into()));
            }
            if !seen.insert(symbol.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate symbol {symbol}")));
            }
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid("channel_capacity must be positive".into()));
        }
        Ok(())
    }
}
