//! Authentication middleware.
//!
//! Extracts the caller's token, hands it to a [`TokenValidator`], and merges
//! the returned identity attributes into the request context. Any rejection
//! aborts the request before downstream stages run.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::pipeline::Stage;
use crate::stages::token::{extract_token, AuthStrategy, Extraction};
use crate::types::{Request, Response};
use aegis_config::{AuthConfig, ConfigError};
use aegis_core::{AppError, Attributes, Context, Failure};
use std::future::Future;
use std::sync::Arc;

/// What a [`TokenValidator`] returns.
///
/// `Ok(None)` means the token was well formed but matched no user.
pub type ValidationResult = Result<Option<Attributes>, Failure>;

/// Checks a token and returns the caller's identity attributes.
///
/// Implemented for closures of shape
/// `Fn(&Request, String) -> impl Future<Output = ValidationResult>`.
/// A closure that needs request data copies it out before its `async` block.
pub trait TokenValidator: Send + Sync + 'static {
    /// Validates `token`, which was extracted from `request`.
    fn validate<'a>(&'a self, request: &'a Request, token: String) -> BoxFuture<'a, ValidationResult>;
}

impl<F, Fut> TokenValidator for F
where
    F: Fn(&Request, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ValidationResult> + Send + 'static,
{
    fn validate<'a>(&'a self, request: &'a Request, token: String) -> BoxFuture<'a, ValidationResult> {
        Box::pin(self(request, token))
    }
}

/// Authenticates one request.
///
/// On success the validator's attributes are merged into `ctx`, replacing
/// existing keys.
///
/// # Errors
///
/// - an unknown `strategy` gives a traced failure, reported as a masked 500
/// - a missing or malformed token gives `401 missing token` / `401 invalid token`
/// - a validator error is returned unchanged
/// - an unknown user gives `401 user not found`
pub async fn authenticate<V>(
    ctx: &mut MiddlewareContext,
    request: &Request,
    strategy: &str,
    validator: &V,
) -> Result<(), Failure>
where
    V: TokenValidator + ?Sized,
{
    let extraction = extract_token(request, strategy)
        .map_err(anyhow::Error::new)
        .context("error extracting token")?;

    let token = match extraction {
        Extraction::Token(token) => token,
        Extraction::Rejected(rejection) => {
            tracing::debug!(reason = rejection.message(), "Authentication rejected");
            return Err(AppError::unauthorized(rejection.message()).into());
        }
    };

    let attributes = validator
        .validate(request, token)
        .await?
        .ok_or_else(|| AppError::unauthorized("user not found"))?;

    ctx.merge_attributes(attributes);
    Ok(())
}

/// Pipeline stage that runs [`authenticate`].
///
/// # Example
///
/// ```
/// use aegis_middleware::stages::{AuthenticationMiddleware, ValidationResult};
/// use aegis_middleware::Request;
/// use serde_json::json;
///
/// let middleware = AuthenticationMiddleware::new("Bearer", |_req: &Request, token: String| async move {
///     if token == "abc123" {
///         let attributes = [("user_id".to_string(), json!("123"))].into_iter().collect();
///         ValidationResult::Ok(Some(attributes))
///     } else {
///         Ok(None)
///     }
/// })
/// .unwrap();
///
/// assert_eq!(middleware.strategy().as_str(), "Bearer");
/// ```
pub struct AuthenticationMiddleware {
    strategy: AuthStrategy,
    validator: Arc<dyn TokenValidator>,
}

impl AuthenticationMiddleware {
    /// Creates the stage.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `strategy` is not supported.
    pub fn new<V: TokenValidator>(strategy: &str, validator: V) -> Result<Self, ConfigError> {
        let strategy = strategy
            .parse::<AuthStrategy>()
            .map_err(|e| ConfigError::invalid_value("auth.strategy", e.to_string()))?;

        Ok(Self {
            strategy,
            validator: Arc::new(validator),
        })
    }

    /// Creates the stage from the `[auth]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the configured strategy is not
    /// supported.
    pub fn from_config<V: TokenValidator>(config: &AuthConfig, validator: V) -> Result<Self, ConfigError> {
        Self::new(&config.strategy, validator)
    }

    /// Returns the extraction strategy.
    #[must_use]
    pub fn strategy(&self) -> AuthStrategy {
        self.strategy
    }
}

impl Middleware for AuthenticationMiddleware {
    fn name(&self) -> &'static str {
        Stage::Authentication.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            match authenticate(ctx, &request, self.strategy.as_str(), self.validator.as_ref()).await {
                Ok(()) => next.run(ctx, request).await,
                Err(failure) => ctx.fail(failure, self.name()),
            }
        })
    }
}
