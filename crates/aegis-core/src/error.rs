//! Typed application errors.
//!
//! [`AppError`] is the terminal error type of the pipeline: every failure a
//! request can produce ends up as exactly one `AppError`, which carries an HTTP
//! status and a message that is safe to show to the caller.
//!
//! The set of variants is closed. Each variant belongs to an [`ErrorCategory`],
//! and the category alone decides the status code:
//!
//! | `ErrorCategory` | Status |
//! |---|---|
//! | `BadRequest` | 400 |
//! | `Unauthorized` | 401 |
//! | `Forbidden` | 403 |
//! | `NotFound` | 404 |
//! | `Conflict` | 409 |
//! | `Validation` | 422 |
//! | `Internal` | 500 |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message returned to callers for every masked server fault.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Result type alias using [`AppError`].
pub type AppResult<T> = Result<T, AppError>;

/// Categories of typed errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed request (bad body, bad parameter, abandoned connection).
    BadRequest,
    /// Missing or unusable credentials.
    Unauthorized,
    /// Authenticated caller lacks access.
    Forbidden,
    /// Resource not found.
    NotFound,
    /// Conflicting state (e.g., duplicate resource).
    Conflict,
    /// Structured field-level validation failure.
    Validation,
    /// Server fault. Always masked.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for categories that indicate a server fault.
    #[must_use]
    pub const fn is_server_fault(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// A typed application error.
///
/// Handlers and middleware return this when they already know what the
/// caller should see. The error classifier passes an `AppError` through
/// untouched.
///
/// # Example
///
/// ```
/// use aegis_core::{AppError, ErrorCategory};
/// use http::StatusCode;
///
/// let error = AppError::unauthorized("missing token");
/// assert_eq!(error.category(), ErrorCategory::Unauthorized);
/// assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
/// assert_eq!(error.to_string(), "missing token");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// The request could not be understood.
    #[error("{message}")]
    BadRequest {
        /// User-facing message.
        message: String,
    },

    /// Authentication failed.
    #[error("{message}")]
    Unauthorized {
        /// User-facing message.
        message: String,
    },

    /// Access denied.
    #[error("{message}")]
    Forbidden {
        /// User-facing message.
        message: String,
    },

    /// Resource not found.
    #[error("{message}")]
    NotFound {
        /// User-facing message.
        message: String,
    },

    /// Conflicting state.
    #[error("{message}")]
    Conflict {
        /// User-facing message.
        message: String,
    },

    /// Field-level validation failed.
    #[error("{}", .errors.join("; "))]
    Validation {
        /// One message per failed field, in reporting order.
        errors: Vec<String>,
    },

    /// Masked server fault.
    #[error("internal server error")]
    Internal,
}

impl AppError {
    /// Creates a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates an unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a validation error from field messages.
    #[must_use]
    pub fn validation<I, S>(errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Validation {
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates the masked internal error.
    #[must_use]
    pub const fn internal() -> Self {
        Self::Internal
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::BadRequest { .. } => ErrorCategory::BadRequest,
            Self::Unauthorized { .. } => ErrorCategory::Unauthorized,
            Self::Forbidden { .. } => ErrorCategory::Forbidden,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns the field messages of a validation error.
    #[must_use]
    pub fn field_errors(&self) -> Option<&[String]> {
        match self {
            Self::Validation { errors } => Some(errors),
            _ => None,
        }
    }

    /// Returns `true` if the caller only ever sees the generic message.
    #[must_use]
    pub const fn is_masked(&self) -> bool {
        self.category().is_server_fault()
    }
}
