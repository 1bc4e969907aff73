//! Fixed-order middleware pipeline.
//!
//! ## Pipeline Stages
//!
//! Core stages always run in this order, whatever order they were added in:
//!
//! 1. **Request Logging** - Time the request and log its outcome
//! 2. **Recovery** - Catch panics and write the single error response
//! 3. **Authentication** - Extract and check the caller's token
//! 4. **Authorization** - Check the caller's role against the permission table
//!
//! Custom stages added with [`PipelineBuilder::stage`] run after the core
//! stages, just before the handler, in the order they were added.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::{
    AuthenticationMiddleware, AuthorizationMiddleware, RecoveryMiddleware,
    RequestLoggingMiddleware,
};
use crate::types::{HandlerResult, Request, Response};
use std::sync::Arc;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The middleware pipeline.
///
/// # Example
///
/// ```
/// use aegis_middleware::{HandlerResult, MiddlewareContext, Pipeline, Request};
/// use bytes::Bytes;
/// use http_body_util::Full;
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::builder().recovery().build();
///
/// let mut ctx = MiddlewareContext::new();
/// let request: Request = http::Request::new(Full::new(Bytes::new()));
/// let response = pipeline
///     .process(&mut ctx, request, |_ctx, _req| {
///         Box::pin(async { HandlerResult::Ok(http::Response::new(Full::new(Bytes::new()))) })
///     })
///     .await;
///
/// assert_eq!(response.status(), http::StatusCode::OK);
/// # });
/// ```
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Processes a request through every stage, then the handler.
    pub async fn process<H>(&self, ctx: &mut MiddlewareContext, request: Request, handler: H) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, HandlerResult> + Send,
    {
        let next = self.build_chain(handler);
        next.run(ctx, request).await
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, HandlerResult> + Send + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the names of all middleware stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of middleware stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builder for constructing a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    request_logging: Option<BoxedMiddleware>,
    recovery: Option<BoxedMiddleware>,
    authentication: Option<BoxedMiddleware>,
    authorization: Option<BoxedMiddleware>,
    custom: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables request logging.
    #[must_use]
    pub fn request_logging(mut self) -> Self {
        self.request_logging = Some(Arc::new(RequestLoggingMiddleware::new()));
        self
    }

    /// Enables panic recovery and error response writing.
    ///
    /// Installs the panic hook, so recovered panics are logged with their
    /// location and backtrace.
    #[must_use]
    pub fn recovery(mut self) -> Self {
        self.recovery = Some(Arc::new(RecoveryMiddleware::with_panic_hook()));
        self
    }

    /// Sets the authentication stage.
    #[must_use]
    pub fn authentication(mut self, middleware: AuthenticationMiddleware) -> Self {
        self.authentication = Some(Arc::new(middleware));
        self
    }

    /// Sets the authorization stage.
    #[must_use]
    pub fn authorization(mut self, middleware: AuthorizationMiddleware) -> Self {
        self.authorization = Some(Arc::new(middleware));
        self
    }

    /// Appends a custom stage that runs after the core stages.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.custom.push(Arc::new(middleware));
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        let stages = [
            self.request_logging,
            self.recovery,
            self.authentication,
            self.authorization,
        ]
        .into_iter()
        .flatten()
        .chain(self.custom)
        .collect();

        Pipeline { stages }
    }
}

/// The core stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: Request logging
    RequestLogging = 1,
    /// Stage 2: Panic recovery and error response
    Recovery = 2,
    /// Stage 3: Authentication
    Authentication = 3,
    /// Stage 4: Authorization
    Authorization = 4,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RequestLogging => "request_logging",
            Self::Recovery => "recovery",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Stage; 4] {
        [
            Self::RequestLogging,
            Self::Recovery,
            Self::Authentication,
            Self::Authorization,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{PermissionTable, ValidationResult};
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;
    use std::sync::Mutex;

    struct OrderTracking {
        name: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for OrderTracking {
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
                self.order.lock().unwrap().push(self.name);
                next.run(ctx, request).await
            })
        }
    }

    fn ok(_ctx: &mut MiddlewareContext, _req: Request) -> BoxFuture<'static, HandlerResult> {
        Box::pin(async { HandlerResult::Ok(http::Response::new(Full::new(Bytes::from("OK")))) })
    }

    #[tokio::test]
    async fn test_custom_stages_run_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder()
            .stage(OrderTracking {
                name: "first",
                order: Arc::clone(&order),
            })
            .stage(OrderTracking {
                name: "second",
                order: Arc::clone(&order),
            })
            .build();

        let mut ctx = MiddlewareContext::new();
        let request = http::Request::new(Full::new(Bytes::new()));
        let response = pipeline.process(&mut ctx, request, ok).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_empty_pipeline() {
        let pipeline = Pipeline::builder().build();
        let mut ctx = MiddlewareContext::new();
        let request = http::Request::new(Full::new(Bytes::new()));

        let response = pipeline.process(&mut ctx, request, ok).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(pipeline.stage_count(), 0);
    }

    #[test]
    fn test_core_stage_order_is_fixed() {
        let authentication = AuthenticationMiddleware::new("Bearer", |_req: &Request, _token: String| async {
            ValidationResult::Ok(None)
        })
        .unwrap();
        let authorization =
            AuthorizationMiddleware::new("role", "read", PermissionTable::builder().build()).unwrap();

        let pipeline = Pipeline::builder()
            .authorization(authorization)
            .authentication(authentication)
            .recovery()
            .request_logging()
            .build();

        let expected: Vec<_> = Stage::all().iter().map(|s| s.name()).collect();
        assert_eq!(pipeline.stage_names(), expected);
    }

    #[test]
    fn test_stage_ordering() {
        assert!(Stage::RequestLogging < Stage::Recovery);
        assert!(Stage::Recovery < Stage::Authentication);
        assert!(Stage::Authentication < Stage::Authorization);
    }
}
