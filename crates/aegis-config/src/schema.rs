//! Configuration schema types.
//!
//! This module defines the structure of each configuration section.

use aegis_telemetry::LogConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Authentication section.
///
/// # Example
///
/// ```
/// use aegis_config::AuthConfig;
///
/// let auth = AuthConfig::default();
/// assert_eq!(auth.strategy, "Bearer");
/// assert_eq!(auth.role_key, "role");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Name of the token extraction strategy.
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Attribute key holding the caller's role after authentication.
    #[serde(default = "default_role_key")]
    pub role_key: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            role_key: default_role_key(),
        }
    }
}

fn default_strategy() -> String {
    "Bearer".to_string()
}

fn default_role_key() -> String {
    "role".to_string()
}

/// Role to permission mapping, as written in configuration files.
///
/// ```toml
/// [permissions]
/// admin = ["read", "write", "delete"]
/// viewer = ["read"]
/// ```
pub type PermissionsConfig = BTreeMap<String, Vec<String>>;

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,

    /// Service name reported in the startup log line.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
            service_name: default_service_name(),
        }
    }
}

impl LoggingConfig {
    /// Converts this section into the telemetry crate's [`LogConfig`].
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            json_format: self.format == LogFormat::Json,
            ansi: self.ansi_enabled,
            file_line_info: self.include_location,
            service_name: self.service_name.clone(),
            ..LogConfig::default()
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "aegis-service".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_to_log_config() {
        let section = LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            ansi_enabled: true,
            include_location: true,
            ..LoggingConfig::default()
        };

        let config = section.to_log_config();
        assert_eq!(config.level, "debug");
        assert!(!config.json_format);
        assert!(config.ansi);
        assert!(config.file_line_info);
        assert_eq!(config.service_name, "aegis-service");
    }

    #[test]
    fn test_auth_rejects_unknown_fields() {
        let result: Result<AuthConfig, _> = toml::from_str("strategy = \"Bearer\"\nmode = \"x\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_log_format_lowercase() {
        let section: LoggingConfig = toml::from_str("format = \"pretty\"").unwrap();
        assert_eq!(section.format, LogFormat::Pretty);
        assert!(section.enabled);
    }
}
