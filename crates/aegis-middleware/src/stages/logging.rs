//! Request logging middleware stage.
//!
//! Logs one line per request once the response is known: method, path with
//! query, status, duration and client IP. Failed requests (status 400 and
//! above) are logged at error level together with every recorded error.
//! `OPTIONS` requests are not logged.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::pipeline::Stage;
use crate::types::{RemoteAddr, Request, Response};
use http::{Method, Uri};
use std::time::Instant;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Logs the outcome of each request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLoggingMiddleware;

impl RequestLoggingMiddleware {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for RequestLoggingMiddleware {
    fn name(&self) -> &'static str {
        Stage::RequestLogging.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if request.method() == Method::OPTIONS {
                return next.run(ctx, request).await;
            }

            let start = Instant::now();
            let method = request.method().clone();
            let path = path_with_query(request.uri());
            let client_ip = client_ip(&request);

            let response = next.run(ctx, request).await;

            let status = response.status().as_u16();
            let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

            if status >= 400 {
                let errors = ctx
                    .errors()
                    .iter()
                    .map(|e| format!("{}: {}", e.stage(), e.failure()))
                    .collect::<Vec<_>>()
                    .join("; ");

                tracing::error!(
                    request_id = %ctx.request_id(),
                    http.method = %method,
                    http.path = %path,
                    http.status_code = status,
                    duration_ms,
                    client_ip = %client_ip,
                    errors = %errors,
                    "Request failed"
                );
            } else {
                tracing::info!(
                    request_id = %ctx.request_id(),
                    http.method = %method,
                    http.path = %path,
                    http.status_code = status,
                    duration_ms,
                    client_ip = %client_ip,
                    "Request completed"
                );
            }

            response
        })
    }
}

fn path_with_query(uri: &Uri) -> String {
    match uri.query() {
        Some(query) => format!("{}?{query}", uri.path()),
        None => uri.path().to_string(),
    }
}

/// Resolves the client IP: first `X-Forwarded-For` entry, then `X-Real-IP`,
/// then the peer address.
fn client_ip(request: &Request) -> String {
    let headers = request.headers();

    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get(X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(ip) = forwarded.or_else(real_ip) {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<RemoteAddr>()
        .map_or_else(|| "-".to_string(), |addr| addr.0.ip().to_string())
}
