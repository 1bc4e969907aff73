//! Request-scoped state shared by the middleware stages.
//!
//! A [`MiddlewareContext`] is created once per request and owned by that
//! request. It carries:
//!
//! - the identity attributes established by authentication,
//! - the ordered list of errors recorded by stages and the handler,
//! - whether a response has already been committed,
//! - typed extensions for anything else.

use aegis_core::{Attributes, Context, Failure, RequestId, REQUEST_ID_HEADER};
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::types::{Request, Response, ResponseExt};

/// One error recorded during a request.
#[derive(Debug)]
pub struct RecordedError {
    failure: Failure,
    metadata: Option<Value>,
    stage: &'static str,
}

impl RecordedError {
    /// The recorded failure.
    #[must_use]
    pub fn failure(&self) -> &Failure {
        &self.failure
    }

    /// Extra data attached by the recorder.
    #[must_use]
    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    /// Name of the stage that recorded it.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        self.stage
    }
}

/// Whether a response has been handed back for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseState {
    /// Nothing has been written yet.
    #[default]
    Pending,
    /// A response with this status has been written.
    Committed(StatusCode),
}

/// Context that flows through the middleware pipeline.
///
/// # Example
///
/// ```
/// use aegis_middleware::context::MiddlewareContext;
/// use serde_json::json;
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.set_attribute("user_id", json!("123"));
///
/// let user_id: String = ctx.attribute_as("user_id").unwrap();
/// assert_eq!(user_id, "123");
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    request_id: RequestId,
    handler_name: Option<String>,
    started_at: Instant,
    attributes: Attributes,
    errors: Vec<RecordedError>,
    response: ResponseState,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates a new middleware context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context for `request`, adopting the request ID from the
    /// `x-request-id` header when it holds a valid UUID.
    #[must_use]
    pub fn for_request(request: &Request) -> Self {
        let inbound = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<RequestId>().ok());
        inbound.map_or_else(Self::new, Self::with_request_id)
    }

    /// Creates a context with a specific request ID.
    ///
    /// Useful when the request ID was provided by a client or upstream service.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            handler_name: None,
            started_at: Instant::now(),
            attributes: Attributes::new(),
            errors: Vec::new(),
            response: ResponseState::Pending,
            extensions: HashMap::new(),
        }
    }

    /// Names the handler this request is routed to. Used in error logs.
    #[must_use]
    pub fn with_handler_name(mut self, name: impl Into<String>) -> Self {
        self.handler_name = Some(name.into());
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the handler name, if routing set one.
    #[must_use]
    pub fn handler_name(&self) -> Option<&str> {
        self.handler_name.as_deref()
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    // Attributes

    /// Sets one identity attribute, replacing any previous value.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    /// Returns one identity attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Returns all identity attributes.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Merges attributes into the store. Later values win.
    pub fn merge_attributes(&mut self, attributes: Attributes) {
        self.attributes.extend(attributes);
    }

    /// Reads an attribute as `T`.
    ///
    /// # Errors
    ///
    /// Returns a traced failure if the attribute is absent or has a
    /// different shape.
    pub fn attribute_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, Failure> {
        let value = self
            .attributes
            .get(key)
            .with_context(|| format!("attribute `{key}` is not set"))?;

        serde_json::from_value(value.clone())
            .with_context(|| format!("attribute `{key}` has an unexpected type"))
    }

    // Errors

    /// Appends a failure to the request's error list.
    pub fn record_error(&mut self, failure: impl Into<Failure>, stage: &'static str) {
        self.errors.push(RecordedError {
            failure: failure.into(),
            metadata: None,
            stage,
        });
    }

    /// Appends a failure together with extra data for the error log.
    pub fn record_error_with_metadata(
        &mut self,
        failure: impl Into<Failure>,
        metadata: Value,
        stage: &'static str,
    ) {
        self.errors.push(RecordedError {
            failure: failure.into(),
            metadata: Some(metadata),
            stage,
        });
    }

    /// Records `failure` and returns the placeholder response a stage hands
    /// upstream when it aborts. The recovery stage replaces it.
    #[must_use]
    pub fn fail(&mut self, failure: impl Into<Failure>, stage: &'static str) -> Response {
        let failure = failure.into();
        let status = failure.status_hint();
        self.record_error(failure, stage);
        Response::empty(status)
    }

    /// Returns every recorded error, oldest first.
    #[must_use]
    pub fn errors(&self) -> &[RecordedError] {
        &self.errors
    }

    /// Returns the most recently recorded error.
    #[must_use]
    pub fn last_error(&self) -> Option<&RecordedError> {
        self.errors.last()
    }

    /// Returns `true` if any error was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    // Response state

    /// Marks the response as written.
    ///
    /// Returns `false`, leaving the state untouched, if a response was
    /// already committed.
    pub fn commit(&mut self, status: StatusCode) -> bool {
        match self.response {
            ResponseState::Pending => {
                self.response = ResponseState::Committed(status);
                true
            }
            ResponseState::Committed(_) => false,
        }
    }

    /// Returns `true` once a response has been committed.
    #[must_use]
    pub fn is_written(&self) -> bool {
        matches!(self.response, ResponseState::Committed(_))
    }

    /// Returns the committed status, if any.
    #[must_use]
    pub fn committed_status(&self) -> Option<StatusCode> {
        match self.response {
            ResponseState::Committed(status) => Some(status),
            ResponseState::Pending => None,
        }
    }

    /// Returns the response state.
    #[must_use]
    pub fn response_state(&self) -> ResponseState {
        self.response
    }

    // Extensions

    /// Stores a typed extension value.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}
