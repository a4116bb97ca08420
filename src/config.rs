//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.
//!
//! Nothing in the compiler reads configuration implicitly: a [`Config`] is
//! loaded once by the caller and passed to [`Compiler::new`](crate::Compiler::new).

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub formatting: FormattingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Display formatting used by column formatters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattingConfig {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    #[serde(default = "default_currency_precision")]
    pub currency_precision: usize,

    #[serde(default)]
    pub percentage_precision: usize,

    #[serde(default = "default_hours_precision")]
    pub hours_precision: usize,

    #[serde(default = "default_decimal_precision")]
    pub decimal_precision: usize,

    /// chrono format string for date columns
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_currency_precision() -> usize {
    2
}

fn default_hours_precision() -> usize {
    1
}

fn default_decimal_precision() -> usize {
    2
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            currency_precision: default_currency_precision(),
            percentage_precision: 0,
            hours_precision: default_hours_precision(),
            decimal_precision: default_decimal_precision(),
            date_format: default_date_format(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            error: e.to_string(),
        })?;
        validate_date_format(&config.formatting.date_format)?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Per-user config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("timeql").join("config.toml"))
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [Self::default_path(), Some(PathBuf::from("./timeql.toml"))];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(symbol) = std::env::var("TIMEQL_CURRENCY_SYMBOL") {
            self.formatting.currency_symbol = symbol;
        }
        if let Ok(precision) = std::env::var("TIMEQL_CURRENCY_PRECISION") {
            if let Ok(p) = precision.parse() {
                self.formatting.currency_precision = p;
            }
        }
        if let Ok(format) = std::env::var("TIMEQL_DATE_FORMAT") {
            match validate_date_format(&format) {
                Ok(()) => self.formatting.date_format = format,
                Err(e) => tracing::warn!("Ignoring TIMEQL_DATE_FORMAT: {}", e),
            }
        }

        if let Ok(level) = std::env::var("TIMEQL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TIMEQL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid date_format {format:?}: not a valid chrono format string")]
    InvalidDateFormat { format: String },
}

/// Check a chrono strftime string before it reaches a formatter
pub fn validate_date_format(format: &str) -> Result<(), ConfigError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::InvalidDateFormat {
            format: format.to_string(),
        });
    }
    Ok(())
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# timeql Configuration
#
# Environment variables override these settings:
# - TIMEQL_CURRENCY_SYMBOL
# - TIMEQL_CURRENCY_PRECISION
# - TIMEQL_DATE_FORMAT
# - TIMEQL_LOG_LEVEL
# - TIMEQL_LOG_FORMAT

[formatting]
# Symbol prefixed to currency columns
currency_symbol = "$"

# Decimal places for currency columns
currency_precision = 2

# Decimal places for percentage columns
percentage_precision = 0

# Decimal places for hour columns
hours_precision = 1

# Decimal places for plain numeric columns
decimal_precision = 2

# chrono format string for date columns
date_format = "%Y-%m-%d"

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_round_trips() {
        let config = Config::from_toml(&generate_default_config()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [formatting]
            currency_symbol = "€"
            "#,
        )
        .unwrap();

        assert_eq!(config.formatting.currency_symbol, "€");
        assert_eq!(config.formatting.currency_precision, 2);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"\nformat = \"json\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[formatting\ncurrency_symbol = 1").unwrap();

        match Config::load(file.path()) {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_date_format_is_rejected() {
        let err = Config::from_toml(
            r#"
            [formatting]
            date_format = "%Q"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDateFormat { ref format } if format == "%Q"));

        assert!(validate_date_format("%d/%m/%Y").is_ok());
        assert!(validate_date_format("%Y-%Q").is_err());
    }

    #[test]
    fn test_invalid_date_format_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[formatting]\ndate_format = \"%Q\"").unwrap();

        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::InvalidDateFormat { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("TIMEQL_CURRENCY_SYMBOL", "£");
        let config = Config::from_env();
        std::env::remove_var("TIMEQL_CURRENCY_SYMBOL");

        assert_eq!(config.formatting.currency_symbol, "£");
    }

    #[test]
    fn test_invalid_env_date_format_is_ignored() {
        std::env::set_var("TIMEQL_DATE_FORMAT", "%Q");
        let config = Config::from_env();
        std::env::remove_var("TIMEQL_DATE_FORMAT");

        assert_eq!(config.formatting.date_format, default_date_format());
    }
}
