//! # Aegis
//!
//! **Authentication, authorization and error recovery for HTTP services**
//!
//! Aegis is a fixed-order middleware pipeline that:
//!
//! - authenticates callers from a bearer token and a validator you supply
//! - authorizes them against a static role to permission table
//! - turns every failure, panics included, into one stable JSON error
//!   response with the right status code
//!
//! ## Quick Start
//!
//! ```
//! use aegis::prelude::*;
//! use bytes::Bytes;
//! use http_body_util::Full;
//!
//! # tokio_test::block_on(async {
//! let config = AegisConfig::builder()
//!     .role("admin", ["read", "write"])
//!     .build();
//!
//! let pipeline = aegis::pipeline_from_config(
//!     &config,
//!     |_req: &Request, token: String| async move {
//!         if token == "abc123" {
//!             let mut attributes = Attributes::new();
//!             attributes.insert("role".to_string(), serde_json::json!("admin"));
//!             ValidationResult::Ok(Some(attributes))
//!         } else {
//!             ValidationResult::Ok(None)
//!         }
//!     },
//!     "write",
//! )
//! .unwrap();
//!
//! let request = http::Request::builder()
//!     .header("authorization", "Bearer abc123")
//!     .body(Full::new(Bytes::new()))
//!     .unwrap();
//!
//! let mut ctx = MiddlewareContext::new();
//! let response = pipeline
//!     .process(&mut ctx, request, |_ctx, _req| {
//!         Box::pin(async { HandlerResult::Ok(respond(http::StatusCode::OK, "ok", ())) })
//!     })
//!     .await;
//! assert_eq!(response.status(), http::StatusCode::OK);
//! # });
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → Logging → Recovery → Authentication → Authorization → Handler
//!                        ↓
//!          single JSON error response for the last recorded error or panic
//! ```

#![doc(html_root_url = "https://docs.rs/aegis/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use aegis_core as core;

// Re-export configuration types
pub use aegis_config as config;

// Re-export middleware types
pub use aegis_middleware as middleware;

// Re-export telemetry types
pub use aegis_telemetry as telemetry;

use aegis_config::{AegisConfig, ConfigError};
use aegis_middleware::stages::{
    AuthenticationMiddleware, AuthorizationMiddleware, PermissionTable, TokenValidator,
};
use aegis_middleware::Pipeline;

/// Builds the full pipeline from configuration.
///
/// The pipeline logs each request, recovers panics, authenticates with
/// `validator` using `config.auth`, and requires `permission` from the
/// caller's role according to `config.permissions`.
///
/// # Errors
///
/// Returns [`ConfigError`] if the configuration does not validate, the
/// strategy is unsupported, or `permission` is empty.
pub fn pipeline_from_config<V: TokenValidator>(
    config: &AegisConfig,
    validator: V,
    permission: &str,
) -> Result<Pipeline, ConfigError> {
    config.validate()?;

    let table = PermissionTable::from_config(&config.permissions)?;
    let authentication = AuthenticationMiddleware::from_config(&config.auth, validator)?;
    let authorization = AuthorizationMiddleware::new(config.auth.role_key.as_str(), permission, table)?;

    Ok(Pipeline::builder()
        .request_logging()
        .recovery()
        .authentication(authentication)
        .authorization(authorization)
        .build())
}

/// Installs the global log subscriber described by `config.logging`.
///
/// Does nothing when logging is disabled.
///
/// # Errors
///
/// Returns [`aegis_telemetry::TelemetryError`] if the level does not parse
/// or a subscriber is already installed.
pub fn init_logging(config: &AegisConfig) -> Result<(), aegis_telemetry::TelemetryError> {
    if !config.logging.enabled {
        return Ok(());
    }
    aegis_telemetry::init_logging(&config.logging.to_log_config())
}

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use aegis::prelude::*;
///
/// let error = AppError::forbidden("forbidden");
/// assert_eq!(error.status_code(), http::StatusCode::FORBIDDEN);
/// ```
pub mod prelude {
    pub use aegis_core::{
        AppError, AppResult, Attributes, Cause, Context, FieldErrors, Failure, JsonResponse,
        RequestId, Traced, Validate,
    };

    // Re-export configuration types
    pub use aegis_config::{AegisConfig, ConfigError, ConfigLoader};

    // Re-export middleware types
    pub use aegis_middleware::stages::{
        AuthenticationMiddleware, AuthorizationMiddleware, PermissionTable, TokenValidator,
        ValidationResult,
    };
    pub use aegis_middleware::{
        bind_json, bind_validated_json, respond, BoxFuture, HandlerResult, Middleware,
        MiddlewareContext, Next, Pipeline, Request, Response, ResponseExt,
    };
}
