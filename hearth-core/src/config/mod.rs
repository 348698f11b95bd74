//! Configuration management for hearth
//!
//! Environment-based configuration with defaults, TOML files and validation.

use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Membership manager behaviour
    #[serde(default)]
    pub membership: MembershipConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Membership manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipConfig {
    /// Members per display row
    pub row_group_size: usize,

    /// Image url used when a profile picture cannot be resolved
    pub placeholder_image: String,

    /// Re-fetch the roster and requests when local state diverges from the directory
    pub resync_on_divergence: bool,

    /// Resolve profile pictures after fetching members and requests
    pub decorate_images: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics recording
    pub enabled: bool,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            row_group_size: 3,
            placeholder_image: "/assets/default-avatar.jpg".to_string(),
            resync_on_divergence: true,
            decorate_images: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Parse an environment override, if set
fn env_override<T>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidEnv {
                var,
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: HEARTH_<SECTION>_<KEY>
    /// Example: HEARTH_MEMBERSHIP_ROW_GROUP_SIZE=4
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Membership config
        if let Some(size) = env_override("HEARTH_MEMBERSHIP_ROW_GROUP_SIZE")? {
            config.membership.row_group_size = size;
        }
        if let Some(placeholder) = env_override("HEARTH_MEMBERSHIP_PLACEHOLDER_IMAGE")? {
            config.membership.placeholder_image = placeholder;
        }
        if let Some(resync) = env_override("HEARTH_MEMBERSHIP_RESYNC_ON_DIVERGENCE")? {
            config.membership.resync_on_divergence = resync;
        }
        if let Some(decorate) = env_override("HEARTH_MEMBERSHIP_DECORATE_IMAGES")? {
            config.membership.decorate_images = decorate;
        }

        // Logging config
        if let Some(level) = env_override("HEARTH_LOG_LEVEL")? {
            config.logging.level = level;
        }
        if let Some(json) = env_override("HEARTH_LOG_JSON")? {
            config.logging.json_format = json;
        }

        // Metrics config
        if let Some(enabled) = env_override("HEARTH_METRICS_ENABLED")? {
            config.metrics.enabled = enabled;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.membership.row_group_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "row_group_size must be greater than 0".to_string(),
            ));
        }

        if self.membership.placeholder_image.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "placeholder_image must not be empty".to_string(),
            ));
        }

        if self.logging.level.parse::<LogLevel>().is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        std::fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.membership.row_group_size, 3);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.membership.row_group_size = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.membership.placeholder_image = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_validation() {
        let mut config = Config::default();

        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = Config::from_file("/nonexistent/hearth.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/hearth.toml"));
    }

    #[test]
    fn test_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[membership\nrow_group_size = ").unwrap();

        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [membership]
            row_group_size = 4
            placeholder_image = "/img/none.png"
            resync_on_divergence = false
            decorate_images = true
            "#,
        )
        .unwrap();

        assert_eq!(config.membership.row_group_size, 4);
        assert!(!config.membership.resync_on_divergence);
        assert_eq!(config.logging.level, "info");
        assert!(config.metrics.enabled);
    }
}
