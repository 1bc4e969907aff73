//! Failure classification.
//!
//! [`classify`] turns any recorded [`Failure`] into the [`AppError`] the
//! caller sees. Typed errors pass through; traced errors are matched on
//! their [`Cause`]; everything else becomes a masked 500 and is logged with
//! enough request detail to find it.

use crate::context::MiddlewareContext;
use crate::types::{RemoteAddr, Request};
use aegis_core::{AppError, Cause, Failure, Traced, Unwrapped};
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING, USER_AGENT};
use serde_json::Value;
use std::io::ErrorKind;

/// Request details carried into error logs.
///
/// Captured before the request is handed downstream, since the request
/// itself is consumed by the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    /// HTTP method.
    pub method: String,
    /// Request path, without the query.
    pub path: String,
    /// `User-Agent` header.
    pub user_agent: Option<String>,
    /// Peer address, when the server recorded one.
    pub remote_addr: Option<String>,
    /// Handler the request is routed to.
    pub handler: Option<String>,
    /// Request ID.
    pub request_id: String,
    /// Whether the request declared a body.
    pub has_body: bool,
}

impl RequestInfo {
    /// Captures the loggable parts of `request`.
    #[must_use]
    pub fn capture(request: &Request, ctx: &MiddlewareContext) -> Self {
        let headers = request.headers();
        let declared_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        Self {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            user_agent: headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string),
            remote_addr: request
                .extensions()
                .get::<RemoteAddr>()
                .map(|addr| addr.0.to_string()),
            handler: ctx.handler_name().map(ToString::to_string),
            request_id: ctx.request_id().to_string(),
            has_body: declared_length > 0 || headers.contains_key(TRANSFER_ENCODING),
        }
    }
}

/// Maps a failure to the typed error reported to the caller.
///
/// Typed errors are returned unchanged. Traced errors are matched on their
/// cause, in order:
///
/// 1. field validation: 422 with each field message
/// 2. malformed JSON: 400 `invalid json`
/// 3. type mismatch: 400 `invalid value for field <field>`
/// 4. end of input: 400 `missing request body`
/// 5. connection reset or broken pipe: 400 `connection error`
///
/// Anything else, including a failure that was never wrapped, is logged at
/// error level and reported as a masked 500.
#[must_use]
pub fn classify(failure: &Failure, info: &RequestInfo, metadata: Option<&Value>) -> AppError {
    match failure {
        Failure::App(error) => error.clone(),
        Failure::Traced(traced) => classify_traced(traced, info, metadata),
        Failure::Bare(unwrapped) => {
            log_unwrapped(unwrapped, info, metadata);
            AppError::internal()
        }
    }
}

fn classify_traced(traced: &Traced, info: &RequestInfo, metadata: Option<&Value>) -> AppError {
    match traced.cause() {
        Cause::Validation(errors) => AppError::validation(errors.messages()),
        Cause::Syntax { .. } => AppError::bad_request("invalid json"),
        Cause::TypeMismatch { field, .. } if field.is_empty() => {
            AppError::bad_request("invalid request body")
        }
        Cause::TypeMismatch { field, .. } => {
            AppError::bad_request(format!("invalid value for field {field}"))
        }
        Cause::Eof => AppError::bad_request("missing request body"),
        cause if is_eof(cause) => AppError::bad_request("missing request body"),
        cause if is_connection_error(cause) => AppError::bad_request("connection error"),
        _ => {
            tracing::error!(
                error = %traced,
                report = %traced.report(),
                http.method = %info.method,
                http.path = %info.path,
                handler = info.handler.as_deref().unwrap_or("-"),
                request_id = %info.request_id,
                metadata = %render(metadata),
                "Unhandled error"
            );
            AppError::internal()
        }
    }
}

fn is_eof(cause: &Cause) -> bool {
    if !matches!(cause, Cause::Io(_) | Cause::Other(_)) {
        return false;
    }
    cause.root_message() == "EOF"
        || cause
            .io_error()
            .is_some_and(|e| e.kind() == ErrorKind::UnexpectedEof)
}

fn is_connection_error(cause: &Cause) -> bool {
    let text = match cause {
        Cause::Io(error) => error.to_string(),
        Cause::Other(error) => format!("{error:#}"),
        _ => return false,
    };

    text.contains("connection reset by peer")
        || text.contains("broken pipe")
        || cause
            .io_error()
            .is_some_and(|e| matches!(e.kind(), ErrorKind::ConnectionReset | ErrorKind::BrokenPipe))
}

fn log_unwrapped(unwrapped: &Unwrapped, info: &RequestInfo, metadata: Option<&Value>) {
    tracing::error!(
        error_type = unwrapped.type_name(),
        error = %unwrapped,
        http.method = %info.method,
        http.path = %info.path,
        handler = info.handler.as_deref().unwrap_or("-"),
        user_agent = info.user_agent.as_deref().unwrap_or("-"),
        remote_addr = info.remote_addr.as_deref().unwrap_or("-"),
        request_id = %info.request_id,
        metadata = %render(metadata),
        "Unwrapped error reached the error handler"
    );
}

fn render(metadata: Option<&Value>) -> String {
    metadata.map_or_else(String::new, Value::to_string)
}
