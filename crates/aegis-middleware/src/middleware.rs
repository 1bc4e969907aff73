//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that all middleware stages
//! implement, and [`Next`], the continuation a stage calls to run the rest of
//! the chain.
//!
//! A stage that rejects a request records the failure in the context and
//! returns without calling `next`. It never writes the error response
//! itself; the recovery stage does that once per request.
//!
//! # Example
//!
//! ```
//! use aegis_middleware::{BoxFuture, Middleware, MiddlewareContext, Next, Request, Response};
//!
//! struct Tenant;
//!
//! impl Middleware for Tenant {
//!     fn name(&self) -> &'static str {
//!         "tenant"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             ctx.set_attribute("tenant", serde_json::json!("acme"));
//!             next.run(ctx, request).await
//!         })
//!     }
//! }
//! ```

use crate::context::MiddlewareContext;
use crate::types::{HandlerResult, Request, Response};
use std::future::Future;
use std::pin::Pin;

/// A boxed future that returns a response.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Stage name recorded for failures returned by the handler.
pub const HANDLER_STAGE: &str = "handler";

/// The core middleware trait.
///
/// Middleware receives a mutable context, the incoming request, and a
/// [`Next`] callback to invoke the rest of the chain.
///
/// # Invariants
///
/// - Middleware calls `next.run()` at most once
/// - Middleware that aborts records why in the context
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this middleware stage.
    ///
    /// This name is used for logging and as the `stage` of recorded errors.
    fn name(&self) -> &'static str;

    /// Process the request through this middleware.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// Callback to invoke the next middleware in the chain.
///
/// Consumed on use, so it can run at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(
        Box<dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, HandlerResult> + Send + 'a>,
    ),
}

impl<'a> Next<'a> {
    /// Creates a new `Next` that will invoke the given middleware.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, HandlerResult> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next middleware or handler in the chain.
    ///
    /// A handler's successful response commits the request. A handler's
    /// failure is recorded under [`HANDLER_STAGE`] and a placeholder is
    /// returned.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> Response {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => match handler(ctx, request).await {
                Ok(response) => {
                    ctx.commit(response.status());
                    response
                }
                Err(failure) => ctx.fail(failure, HANDLER_STAGE),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::AppError;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;

    struct Visit {
        name: &'static str,
    }

    impl Middleware for Visit {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                let mut visited: Vec<&'static str> =
                    ctx.remove_extension().unwrap_or_default();
                visited.push(self.name);
                ctx.set_extension(visited);
                next.run(ctx, request).await
            })
        }
    }

    fn request() -> Request {
        http::Request::new(Full::new(Bytes::new()))
    }

    fn ok_handler<'a>() -> Next<'a> {
        Next::handler(|_ctx, _req| {
            Box::pin(async { HandlerResult::Ok(http::Response::new(Full::new(Bytes::from("OK")))) })
        })
    }

    #[tokio::test]
    async fn test_handler_success_commits() {
        let mut ctx = MiddlewareContext::new();
        let response = ok_handler().run(&mut ctx, request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.committed_status(), Some(StatusCode::OK));
        assert!(!ctx.has_errors());
    }

    #[tokio::test]
    async fn test_handler_failure_is_recorded() {
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { HandlerResult::Err(AppError::not_found("order not found").into()) })
        });

        let response = next.run(&mut ctx, request()).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!ctx.is_written());
        assert_eq!(ctx.last_error().unwrap().stage(), HANDLER_STAGE);
    }

    #[tokio::test]
    async fn test_middleware_chain_order() {
        let first = Visit { name: "first" };
        let second = Visit { name: "second" };
        let mut ctx = MiddlewareContext::new();

        let next = Next::new(&first, Next::new(&second, ok_handler()));
        let response = next.run(&mut ctx, request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            ctx.get_extension::<Vec<&'static str>>(),
            Some(&vec!["first", "second"])
        );
    }
}
