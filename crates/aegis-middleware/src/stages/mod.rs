//! Core middleware stages.
//!
//! The pipeline builder assembles these in a fixed order:
//!
//! 1. [`logging`] - Log method, path, status and duration per request
//! 2. [`recovery`] - Catch panics and write the single error response
//! 3. [`authentication`] - Extract and validate the bearer token
//! 4. [`authorization`] - Check the caller's role against a permission table
//!
//! [`token`] holds the credential extraction used by authentication.

pub mod authentication;
pub mod authorization;
pub mod logging;
pub mod recovery;
pub mod token;

// Re-export main types
pub use authentication::{authenticate, AuthenticationMiddleware, TokenValidator, ValidationResult};
pub use authorization::{authorize, AuthorizationMiddleware, PermissionTable, PermissionTableBuilder};
pub use logging::RequestLoggingMiddleware;
pub use recovery::RecoveryMiddleware;
pub use token::{extract_token, AuthStrategy, Extraction, Rejection, UnsupportedStrategy};
