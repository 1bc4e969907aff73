//! # Aegis Core
//!
//! Core types shared by every Aegis crate:
//!
//! - [`AppError`] - Typed application errors with HTTP status mapping
//! - [`Failure`] - Any error recorded while handling a request
//! - [`Traced`] / [`Cause`] / [`Context`] - Diagnostic-context wrapping
//! - [`FieldErrors`] / [`Validate`] - Field-level validation failures
//! - [`response::JsonResponse`] - The JSON response envelope
//! - [`RequestId`] - UUID v7 request identifier

#![doc(html_root_url = "https://docs.rs/aegis-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod failure;
mod request_id;
pub mod response;
mod validation;

pub use error::{AppError, AppResult, ErrorCategory, INTERNAL_ERROR_MESSAGE};
pub use failure::{Cause, Context, Failure, Frame, Traced, Unwrapped};
pub use request_id::{RequestId, REQUEST_ID_HEADER};
pub use response::{ErrorDetails, JsonResponse, Pagination, QueryOptions};
pub use validation::{FieldError, FieldErrors, Validate};

/// Request-scoped identity attributes produced by authentication.
pub type Attributes = std::collections::HashMap<String, serde_json::Value>;
