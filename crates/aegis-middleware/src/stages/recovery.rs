//! Recovery middleware stage.
//!
//! Wraps everything downstream and owns the error response:
//!
//! - a panic is caught, logged with request details, and turned into a
//!   masked 500
//! - otherwise the last recorded error, if any, is classified and written as
//!   the JSON error envelope
//!
//! Either way a response is written at most once. If one was already
//! committed, the stage logs and leaves it alone.

use crate::classify::{classify, RequestInfo};
use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::panic::{install_panic_hook, take_panic_record, PanicKind};
use crate::pipeline::Stage;
use crate::types::{Request, Response, ResponseExt};
use aegis_core::AppError;
use futures_util::FutureExt;
use http::StatusCode;
use std::any::Any;
use std::panic::AssertUnwindSafe;

/// Catches panics and writes the single error response for a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryMiddleware;

impl RecoveryMiddleware {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Creates the stage and installs the panic hook, so recovery logs
    /// carry the panic location and backtrace.
    #[must_use]
    pub fn with_panic_hook() -> Self {
        install_panic_hook();
        Self
    }
}

impl Middleware for RecoveryMiddleware {
    fn name(&self) -> &'static str {
        Stage::Recovery.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let info = RequestInfo::capture(&request, ctx);

            match AssertUnwindSafe(next.run(ctx, request)).catch_unwind().await {
                Ok(response) => write_recorded_error(ctx, &info, response),
                Err(payload) => recover(ctx, &info, payload.as_ref()),
            }
        })
    }
}

fn write_recorded_error(ctx: &mut MiddlewareContext, info: &RequestInfo, response: Response) -> Response {
    let error = match ctx.last_error() {
        Some(last) => classify(last.failure(), info, last.metadata()),
        None => return response,
    };

    if ctx.commit(error.status_code()) {
        return Response::from_app_error(&error);
    }

    tracing::warn!(
        http.status_code = ctx.committed_status().map_or(0, |s| s.as_u16()),
        error = %error,
        http.path = %info.path,
        "Response already written, dropping error response"
    );
    response
}

fn recover(ctx: &mut MiddlewareContext, info: &RequestInfo, payload: &(dyn Any + Send)) -> Response {
    let kind = PanicKind::from_payload(payload);
    let record = take_panic_record();
    let fault = match &kind {
        PanicKind::RuntimeFault { fault, .. } => fault.name(),
        _ => "-",
    };

    tracing::error!(
        panic = kind.message(),
        panic_kind = kind.kind(),
        fault,
        http.method = %info.method,
        http.path = %info.path,
        handler = info.handler.as_deref().unwrap_or("-"),
        user_agent = info.user_agent.as_deref().unwrap_or("-"),
        remote_addr = info.remote_addr.as_deref().unwrap_or("-"),
        has_body = info.has_body,
        request_id = %info.request_id,
        location = record.as_ref().and_then(|r| r.location.as_deref()).unwrap_or("-"),
        backtrace = record.as_ref().map_or("-", |r| r.backtrace.as_str()),
        "Panic recovered"
    );

    if ctx.commit(StatusCode::INTERNAL_SERVER_ERROR) {
        return Response::from_app_error(&AppError::internal());
    }

    let status = ctx
        .committed_status()
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    tracing::warn!(
        http.status_code = status.as_u16(),
        http.path = %info.path,
        "Response already written"
    );
    Response::empty(status)
}
