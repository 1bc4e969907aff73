//! Failures raised while handling a request.
//!
//! Every error recorded during a request is a [`Failure`], one of three shapes:
//!
//! - [`Failure::App`]: a typed [`AppError`] that already knows its status and
//!   message.
//! - [`Failure::Traced`]: an underlying [`Cause`] wrapped with diagnostic
//!   context (message frames, caller locations, and a backtrace).
//! - [`Failure::Bare`]: an error that was never wrapped. Reaching the
//!   classifier with one of these is a programming error in the service.
//!
//! Use [`Context`] to wrap errors at the point they occur:
//!
//! ```
//! use aegis_core::{Cause, Context, Failure};
//!
//! fn parse(body: &[u8]) -> Result<serde_json::Value, Failure> {
//!     serde_json::from_slice(body).context("failed to parse payload")
//! }
//!
//! let failure = parse(b"{not json").unwrap_err();
//! match failure {
//!     Failure::Traced(traced) => assert!(matches!(traced.cause(), Cause::Syntax { .. })),
//!     other => panic!("unexpected failure: {other:?}"),
//! }
//! ```

use crate::error::AppError;
use crate::validation::FieldErrors;
use http::StatusCode;
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::Location;
use thiserror::Error;

/// Underlying error categories understood by the classifier.
#[derive(Debug, Error)]
pub enum Cause {
    /// Structured field validation failed.
    #[error(transparent)]
    Validation(#[from] FieldErrors),

    /// Input was not syntactically valid JSON.
    #[error("malformed JSON: {detail}")]
    Syntax {
        /// Parser diagnostic.
        detail: String,
    },

    /// A value had the wrong type for its field.
    #[error("invalid value for `{field}`: {detail}")]
    TypeMismatch {
        /// Field path, empty when the mismatch is at the document root.
        field: String,
        /// Deserializer diagnostic.
        detail: String,
    },

    /// Input ended before a value was read.
    #[error("EOF")]
    Eof,

    /// I/O error while reading or writing.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Anything else.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Cause {
    /// Classifies a JSON error, attributing data errors to `field`.
    #[must_use]
    pub fn from_json(error: serde_json::Error, field: impl Into<String>) -> Self {
        use serde_json::error::Category;

        match error.classify() {
            Category::Syntax => Self::Syntax {
                detail: error.to_string(),
            },
            Category::Data => Self::TypeMismatch {
                field: field.into(),
                detail: error.to_string(),
            },
            Category::Eof => Self::Eof,
            Category::Io => Self::Io(error.into()),
        }
    }

    /// Returns the I/O error behind this cause, if any.
    #[must_use]
    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            Self::Io(error) => Some(error),
            Self::Other(error) => error.chain().find_map(|e| e.downcast_ref::<std::io::Error>()),
            _ => None,
        }
    }

    /// Returns the text of the innermost error.
    #[must_use]
    pub fn root_message(&self) -> String {
        match self {
            Self::Other(error) => error.root_cause().to_string(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for Cause {
    fn from(error: serde_json::Error) -> Self {
        Self::from_json(error, String::new())
    }
}

/// One context message attached to a [`Traced`] error.
#[derive(Debug, Clone)]
pub struct Frame {
    message: String,
    location: &'static Location<'static>,
}

impl Frame {
    /// Returns the context message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns where the context was attached.
    #[must_use]
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

/// An error wrapped with diagnostic context.
///
/// Wrapping never changes the [`Cause`]: adding more context only pushes
/// another [`Frame`].
#[derive(Debug)]
pub struct Traced {
    cause: Cause,
    origin: &'static Location<'static>,
    frames: Vec<Frame>,
    backtrace: Backtrace,
}

impl Traced {
    /// Wraps a cause without a context message.
    #[track_caller]
    pub fn new(cause: impl Into<Cause>) -> Self {
        Self {
            cause: cause.into(),
            origin: Location::caller(),
            frames: Vec::new(),
            backtrace: Backtrace::capture(),
        }
    }

    /// Wraps a cause with a context message.
    #[track_caller]
    pub fn wrap(cause: impl Into<Cause>, message: impl Into<String>) -> Self {
        Self::new(cause).context(message)
    }

    /// Creates a traced error from a message alone.
    #[track_caller]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(anyhow::Error::msg(message.into()))
    }

    /// Adds another context frame.
    #[track_caller]
    #[must_use]
    pub fn context(mut self, message: impl Into<String>) -> Self {
        self.frames.push(Frame {
            message: message.into(),
            location: Location::caller(),
        });
        self
    }

    /// Returns the underlying cause.
    #[must_use]
    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    /// Consumes the wrapper and returns the underlying cause.
    #[must_use]
    pub fn into_cause(self) -> Cause {
        self.cause
    }

    /// Returns the context frames, innermost first.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Returns where the error was first wrapped.
    #[must_use]
    pub fn origin(&self) -> &'static Location<'static> {
        self.origin
    }

    /// Returns the backtrace captured when the error was first wrapped.
    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Renders the full diagnostic report used in logs.
    #[must_use]
    pub fn report(&self) -> String {
        let mut report = format!("{self}\n  caused by: {:?}\n  origin: {}", self.cause, self.origin);
        for frame in self.frames.iter().rev() {
            report.push_str(&format!("\n  context: {} at {}", frame.message, frame.location));
        }
        report.push_str(&format!("\n  backtrace:\n{}", self.backtrace));
        report
    }
}

impl fmt::Display for Traced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in self.frames.iter().rev() {
            write!(f, "{}: ", frame.message)?;
        }
        write!(f, "{}", self.cause)
    }
}

impl std::error::Error for Traced {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// An error that was recorded without diagnostic context.
#[derive(Debug)]
pub struct Unwrapped {
    error: anyhow::Error,
    type_name: &'static str,
}

impl Unwrapped {
    /// Returns the Rust type name of the original error.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the underlying error.
    #[must_use]
    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }
}

impl fmt::Display for Unwrapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

/// Any error recorded while handling a request.
#[derive(Debug, Error)]
pub enum Failure {
    /// Typed application error.
    #[error(transparent)]
    App(#[from] AppError),

    /// Error wrapped with diagnostic context.
    #[error(transparent)]
    Traced(Box<Traced>),

    /// Error recorded without context.
    #[error("{0}")]
    Bare(Unwrapped),
}

impl Failure {
    /// Records an arbitrary error without context.
    pub fn bare<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Bare(Unwrapped {
            error: anyhow::Error::new(error),
            type_name: std::any::type_name::<E>(),
        })
    }

    /// Adds a context frame.
    ///
    /// Typed errors are terminal and come back unchanged. Bare errors become
    /// traced errors.
    #[track_caller]
    #[must_use]
    pub fn context(self, message: impl Into<String>) -> Self {
        match self {
            Self::App(error) => Self::App(error),
            Self::Traced(traced) => Self::Traced(Box::new(traced.context(message))),
            Self::Bare(unwrapped) => Traced::wrap(unwrapped.error, message).into(),
        }
    }

    /// Returns the typed error, if this is one.
    #[must_use]
    pub fn as_app(&self) -> Option<&AppError> {
        match self {
            Self::App(error) => Some(error),
            _ => None,
        }
    }

    /// Returns the status a response for this failure would carry.
    #[must_use]
    pub fn status_hint(&self) -> StatusCode {
        match self {
            Self::App(error) => error.status_code(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short name of the variant, used as a log field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::App(_) => "app",
            Self::Traced(_) => "traced",
            Self::Bare(_) => "bare",
        }
    }
}

impl From<Traced> for Failure {
    fn from(traced: Traced) -> Self {
        Self::Traced(Box::new(traced))
    }
}

impl From<anyhow::Error> for Failure {
    fn from(error: anyhow::Error) -> Self {
        Self::Bare(Unwrapped {
            error,
            type_name: "anyhow::Error",
        })
    }
}

/// Adds diagnostic context to fallible values.
pub trait Context<T> {
    /// Wraps the error with a context message.
    fn context<M: Into<String>>(self, message: M) -> Result<T, Failure>;

    /// Wraps the error with a lazily built context message.
    fn with_context<M, F>(self, f: F) -> Result<T, Failure>
    where
        M: Into<String>,
        F: FnOnce() -> M;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: Into<Cause>,
{
    #[track_caller]
    fn context<M: Into<String>>(self, message: M) -> Result<T, Failure> {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(Traced::wrap(error, message).into()),
        }
    }

    #[track_caller]
    fn with_context<M, F>(self, f: F) -> Result<T, Failure>
    where
        M: Into<String>,
        F: FnOnce() -> M,
    {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(Traced::wrap(error, f()).into()),
        }
    }
}

impl<T> Context<T> for Option<T> {
    #[track_caller]
    fn context<M: Into<String>>(self, message: M) -> Result<T, Failure> {
        match self {
            Some(value) => Ok(value),
            None => Err(Traced::msg(message).into()),
        }
    }

    #[track_caller]
    fn with_context<M, F>(self, f: F) -> Result<T, Failure>
    where
        M: Into<String>,
        F: FnOnce() -> M,
    {
        match self {
            Some(value) => Ok(value),
            None => Err(Traced::msg(f()).into()),
        }
    }
}
