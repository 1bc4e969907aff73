//! Structured logging for the Aegis request pipeline.
//!
//! Aegis never writes diagnostics to stdout directly. Every stage emits
//! `tracing` events using the names in [`logging::fields`], and this crate
//! decides where those events go:
//!
//! - [`init_logging`] installs a JSON (production) or pretty (development)
//!   subscriber filtered by an `EnvFilter` directive.
//! - [`capture::LogCapture`] collects events in memory for tests.
//!
//! # Example
//!
//! ```no_run
//! use aegis_telemetry::{init_logging, LogConfig};
//!
//! fn main() -> Result<(), aegis_telemetry::TelemetryError> {
//!     init_logging(&LogConfig::production())?;
//!     tracing::info!("service started");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod capture;
pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
