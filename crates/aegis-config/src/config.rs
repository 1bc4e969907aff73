//! Main configuration types.
//!
//! This module provides the top-level [`AegisConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{AuthConfig, ConfigError, LogFormat, LoggingConfig, PermissionsConfig};

/// Complete Aegis pipeline configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use aegis_config::AegisConfig;
///
/// let config = AegisConfig::default();
/// assert_eq!(config.auth.strategy, "Bearer");
/// assert!(config.permissions.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct AegisConfig {
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Role to permission table.
    #[serde(default)]
    pub permissions: PermissionsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AegisConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> AegisConfigBuilder {
        AegisConfigBuilder::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The auth strategy or role key is empty
    /// - A role or permission name is empty
    /// - The log level is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.strategy.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "auth.strategy",
                "must not be empty",
            ));
        }

        if self.auth.role_key.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "auth.role_key",
                "must not be empty",
            ));
        }

        for (role, permissions) in &self.permissions {
            if role.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    "permissions",
                    "role names must not be empty",
                ));
            }
            if permissions.iter().any(|p| p.trim().is_empty()) {
                return Err(ConfigError::invalid_value(
                    format!("permissions.{role}"),
                    "permission names must not be empty",
                ));
            }
        }

        self.logging
            .to_log_config()
            .validate()
            .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Pretty, colored, debug-level logs with source locations.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.logging.include_location = true;
        config
    }

    /// Create a production configuration preset.
    ///
    /// # Example
    ///
    /// ```
    /// use aegis_config::AegisConfig;
    ///
    /// let config = AegisConfig::production();
    /// assert_eq!(config.logging.format, aegis_config::LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;
        config
    }
}

/// Builder for [`AegisConfig`].
#[derive(Debug, Default)]
pub struct AegisConfigBuilder {
    auth: Option<AuthConfig>,
    permissions: PermissionsConfig,
    logging: Option<LoggingConfig>,
}

impl AegisConfigBuilder {
    /// Set the authentication section.
    #[must_use]
    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Grant `permissions` to `role`.
    #[must_use]
    pub fn role<I, S>(mut self, role: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .entry(role.into())
            .or_default()
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> AegisConfig {
        AegisConfig {
            auth: self.auth.unwrap_or_default(),
            permissions: self.permissions,
            logging: self.logging.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(AegisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = AegisConfig::builder()
            .role("admin", ["read", "write"])
            .role("viewer", ["read"])
            .role("admin", ["delete"])
            .build();

        assert_eq!(config.permissions["admin"], vec!["read", "write", "delete"]);
        assert_eq!(config.permissions["viewer"], vec!["read"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_strategy_is_rejected() {
        let config = AegisConfig::builder()
            .auth(AuthConfig {
                strategy: " ".to_string(),
                ..AuthConfig::default()
            })
            .build();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("auth.strategy"));
    }

    #[test]
    fn test_empty_role_key_is_rejected() {
        let config = AegisConfig::builder()
            .auth(AuthConfig {
                role_key: String::new(),
                ..AuthConfig::default()
            })
            .build();

        assert!(config.validate().unwrap_err().to_string().contains("auth.role_key"));
    }

    #[test]
    fn test_empty_permission_is_rejected() {
        let config = AegisConfig::builder().role("viewer", ["read", ""]).build();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("permissions.viewer"));
    }

    #[test]
    fn test_empty_role_name_is_rejected() {
        let config = AegisConfig::builder().role("", ["read"]).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let config = AegisConfig::builder()
            .logging(LoggingConfig {
                level: "info,aegis=loud".to_string(),
                ..LoggingConfig::default()
            })
            .build();

        assert!(config.validate().unwrap_err().to_string().contains("logging.level"));
    }

    #[test]
    fn test_presets() {
        let dev = AegisConfig::development();
        assert_eq!(dev.logging.level, "debug");
        assert_eq!(dev.logging.format, LogFormat::Pretty);
        assert!(dev.logging.ansi_enabled);

        let prod = AegisConfig::production();
        assert_eq!(prod.logging.format, LogFormat::Json);
        assert!(!prod.logging.ansi_enabled);
    }
}
