//! Common types used throughout the middleware pipeline.

use aegis_core::{AppError, Failure, JsonResponse};
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use std::net::SocketAddr;

/// The HTTP request type used in the middleware pipeline.
///
/// This is a standard `http::Request` with a `Full<Bytes>` body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the middleware pipeline.
///
/// This is a standard `http::Response` with a `Full<Bytes>` body.
pub type Response = http::Response<Full<Bytes>>;

/// What a handler returns.
pub type HandlerResult = Result<Response, Failure>;

/// Peer address of the connection, inserted into request extensions by the
/// server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteAddr(pub SocketAddr);

const JSON_CONTENT_TYPE: &str = "application/json";
const FALLBACK_BODY: &str = r#"{"message":"internal server error","errors":"internal server error"}"#;

/// Extension trait for building JSON envelope responses.
pub trait ResponseExt {
    /// Serializes `body` as the response payload.
    fn json(status: StatusCode, body: &JsonResponse) -> Response;

    /// Builds the error envelope for a typed error, using its status.
    fn from_app_error(error: &AppError) -> Response;

    /// Builds an empty response with the given status.
    fn empty(status: StatusCode) -> Response;
}

impl ResponseExt for Response {
    fn json(status: StatusCode, body: &JsonResponse) -> Response {
        let (status, bytes) = match serde_json::to_vec(body) {
            Ok(bytes) => (status, Bytes::from(bytes)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Bytes::from_static(FALLBACK_BODY.as_bytes()),
                )
            }
        };

        let mut response = http::Response::new(Full::new(bytes));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        response
    }

    fn from_app_error(error: &AppError) -> Response {
        Self::json(error.status_code(), &JsonResponse::from_error(error))
    }

    fn empty(status: StatusCode) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::new()));
        *response.status_mut() = status;
        response
    }
}

/// Builds a success envelope carrying `data`.
///
/// ```
/// use aegis_middleware::respond;
/// use http::StatusCode;
///
/// let response = respond(StatusCode::CREATED, "user created", serde_json::json!({"id": 7}));
/// assert_eq!(response.status(), StatusCode::CREATED);
/// ```
pub fn respond<T: Serialize>(status: StatusCode, message: &str, data: T) -> Response {
    Response::json(status, &JsonResponse::new(message).with_data(data))
}
