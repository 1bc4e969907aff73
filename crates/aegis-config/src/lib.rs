//! Typed configuration for the Aegis request pipeline.
//!
//! This crate provides:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! [`AegisConfig`] holds everything the pipeline needs at startup:
//!
//! - [`AuthConfig`] - token strategy and the attribute key holding the role
//! - [`PermissionsConfig`] - the role to permission table
//! - [`LoggingConfig`] - log level and output format
//!
//! # Example
//!
//! ```no_run
//! use aegis_config::ConfigLoader;
//!
//! # fn main() -> Result<(), aegis_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("aegis.toml")?
//!     .with_env_prefix("AEGIS")
//!     .load()?;
//!
//! println!("auth strategy: {}", config.auth.strategy);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [auth]
//! strategy = "Bearer"
//! role_key = "role"
//!
//! [permissions]
//! admin = ["read", "write", "delete"]
//! viewer = ["read"]
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with variables of the form `PREFIX__SECTION__KEY`:
//!
//! - `AEGIS__AUTH__ROLE_KEY=group`
//! - `AEGIS__LOGGING__LEVEL=debug`
//! - `AEGIS__PERMISSIONS__EDITOR=read,write`

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AegisConfig::default();
        assert_eq!(config.auth.strategy, "Bearer");
        assert!(config.logging.enabled);
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = AegisConfig::builder().role("viewer", ["read"]).build();
        let text = toml::to_string(&config).unwrap();
        let parsed: AegisConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
