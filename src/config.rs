//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Session store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Merge the latest associated session per tag when opening
    #[serde(default = "default_merge_associated")]
    pub merge_associated: bool,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("stint").to_string_lossy().to_string())
        .unwrap_or_else(|| "./stint_data".to_string())
}

fn default_merge_associated() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            merge_associated: default_merge_associated(),
        }
    }
}

/// Export defaults
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Output format: csv or json
    #[serde(default = "default_export_format")]
    pub format: String,

    /// Timestamp rendering: clock (HH:MM:SS.fff) or ticks
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

fn default_export_format() -> String {
    "csv".to_string()
}

fn default_time_format() -> String {
    "clock".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: default_export_format(),
            time_format: default_time_format(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
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

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

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

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("stint").join("config.toml")),
            Some(PathBuf::from("/etc/stint/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(data_dir) = std::env::var("STINT_DATA_DIR") {
            self.session.data_dir = data_dir;
        }
        if let Ok(merge) = std::env::var("STINT_MERGE_ASSOCIATED") {
            if let Ok(value) = merge.parse() {
                self.session.merge_associated = value;
            }
        }

        if let Ok(format) = std::env::var("STINT_EXPORT_FORMAT") {
            self.export.format = format;
        }
        if let Ok(time_format) = std::env::var("STINT_TIME_FORMAT") {
            self.export.time_format = time_format;
        }

        if let Ok(level) = std::env::var("STINT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("STINT_LOG_FORMAT") {
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
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Stint Configuration
#
# Environment variables override these settings:
# - STINT_DATA_DIR
# - STINT_MERGE_ASSOCIATED
# - STINT_EXPORT_FORMAT
# - STINT_TIME_FORMAT
# - STINT_LOG_LEVEL
# - STINT_LOG_FORMAT

[session]
# Directory session files are resolved against
data_dir = "~/.local/share/stint"

# Merge the latest associated session per tag when opening
merge_associated = true

[export]
# Output format: csv or json
format = "csv"

# Timestamp rendering: clock (HH:MM:SS.fff) or ticks
time_format = "clock"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/stint/stint.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.session.merge_associated);
        assert_eq!(config.export.format, "csv");
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_partial_file_overrides_defaults() {
        let config: Config = toml::from_str(
            r#"
            [session]
            data_dir = "/telemetry/sessions"

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.session.data_dir, "/telemetry/sessions");
        assert!(config.session.merge_associated); // Untouched default
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_generated_config_parses() {
        let content = generate_default_config();
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config.export.time_format, "clock");
    }
}
