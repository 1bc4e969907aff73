//! JSON response envelope.
//!
//! Every JSON body produced by Aegis uses the same envelope:
//!
//! ```json
//! {
//!   "message": "users fetched",
//!   "data": [...],
//!   "errors": "..." | ["...", "..."],
//!   "pagination": { "totalData": 42, "currentPage": 2, ... }
//! }
//! ```
//!
//! `data`, `errors`, and `pagination` are omitted when empty.

use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Pagination query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// 1-based page number.
    pub page: i64,
    /// Page size.
    pub limit: i64,
}

/// Pagination metadata returned alongside list results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Total number of items across all pages.
    pub total_data: i64,
    /// The page being returned.
    pub current_page: i64,
    /// Total number of pages.
    pub total_pages: i64,
    /// Whether a later page exists.
    pub has_next_page: bool,
    /// Whether an earlier page exists.
    pub has_prev_page: bool,
}

impl Pagination {
    /// Computes pagination metadata for `total_data` items.
    ///
    /// Returns `None` when `limit` is not positive.
    #[must_use]
    pub fn compute(options: QueryOptions, total_data: i64) -> Option<Self> {
        if options.limit <= 0 {
            return None;
        }

        let items = total_data.max(0);
        let total_pages = items / options.limit + i64::from(items % options.limit > 0);

        Some(Self {
            total_data,
            current_page: options.page,
            total_pages,
            has_next_page: options.page < total_pages,
            has_prev_page: options.page > 1,
        })
    }

    /// Returns `true` if every field is at its zero value.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// The `errors` member of the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetails {
    /// A single message.
    Message(String),
    /// One message per failed field.
    List(Vec<String>),
}

/// Standard JSON response envelope.
///
/// # Example
///
/// ```
/// use aegis_core::response::{JsonResponse, QueryOptions};
///
/// let body = JsonResponse::new("users fetched")
///     .with_data(vec!["alice", "bob"])
///     .with_pagination(QueryOptions { page: 1, limit: 2 }, 5);
///
/// let json = serde_json::to_value(&body).unwrap();
/// assert_eq!(json["pagination"]["totalPages"], 3);
/// assert_eq!(json["pagination"]["hasNextPage"], true);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonResponse {
    /// Human-readable summary.
    pub message: String,

    /// Payload.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,

    /// Error details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorDetails>,

    /// Pagination metadata.
    #[serde(default, skip_serializing_if = "Pagination::is_zero")]
    pub pagination: Pagination,
}

impl JsonResponse {
    /// Creates an envelope carrying only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: serde_json::Value::Null,
            errors: None,
            pagination: Pagination::default(),
        }
    }

    /// Builds the error envelope for a typed error.
    ///
    /// Validation errors list every field message; all other errors repeat
    /// their message.
    #[must_use]
    pub fn from_error(error: &AppError) -> Self {
        let errors = match error.field_errors() {
            Some(fields) => ErrorDetails::List(fields.to_vec()),
            None => ErrorDetails::Message(error.to_string()),
        };

        Self::new(error.to_string()).with_errors(errors)
    }

    /// Attaches a payload.
    ///
    /// Payloads that fail to serialize are dropped.
    #[must_use]
    pub fn with_data<T: Serialize>(mut self, data: T) -> Self {
        self.data = serde_json::to_value(data).unwrap_or_default();
        self
    }

    /// Attaches error details.
    #[must_use]
    pub fn with_errors(mut self, errors: ErrorDetails) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Attaches pagination metadata. A non-positive limit leaves it unset.
    #[must_use]
    pub fn with_pagination(mut self, options: QueryOptions, total_data: i64) -> Self {
        if let Some(pagination) = Pagination::compute(options, total_data) {
            self.pagination = pagination;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_only_envelope() {
        let json = serde_json::to_value(JsonResponse::new("ok")).unwrap();
        assert_eq!(json, json!({"message": "ok"}));
    }

    #[test]
    fn test_error_envelope_single_message() {
        let body = JsonResponse::from_error(&AppError::unauthorized("missing token"));
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json, json!({"message": "missing token", "errors": "missing token"}));
    }

    #[test]
    fn test_error_envelope_validation_list() {
        let body = JsonResponse::from_error(&AppError::validation(["name: is required"]));
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json["errors"], json!(["name: is required"]));
        assert!(json.get("pagination").is_none());
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_pagination_math() {
        let pagination = Pagination::compute(QueryOptions { page: 2, limit: 10 }, 25).unwrap();
        assert_eq!(pagination.total_pages, 3);
        assert!(pagination.has_next_page);
        assert!(pagination.has_prev_page);

        let last = Pagination::compute(QueryOptions { page: 3, limit: 10 }, 30).unwrap();
        assert_eq!(last.total_pages, 3);
        assert!(!last.has_next_page);

        let empty = Pagination::compute(QueryOptions { page: 1, limit: 10 }, 0).unwrap();
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_prev_page);
    }

    #[test]
    fn test_pagination_near_i64_max() {
        let pagination = Pagination::compute(QueryOptions { page: 1, limit: 10 }, i64::MAX).unwrap();
        assert_eq!(pagination.total_pages, i64::MAX / 10 + 1);
        assert!(pagination.has_next_page);

        let single = Pagination::compute(QueryOptions { page: 1, limit: i64::MAX }, i64::MAX).unwrap();
        assert_eq!(single.total_pages, 1);

        let negative = Pagination::compute(QueryOptions { page: 1, limit: 10 }, -15).unwrap();
        assert_eq!(negative.total_pages, 0);
    }

    #[test]
    fn test_non_positive_limit_skips_pagination() {
        let body = JsonResponse::new("items").with_pagination(QueryOptions { page: 1, limit: 0 }, 9);
        assert!(body.pagination.is_zero());
    }

    #[test]
    fn test_pagination_serializes_camel_case() {
        let body = JsonResponse::new("items")
            .with_data(json!([1, 2]))
            .with_pagination(QueryOptions { page: 1, limit: 2 }, 4);
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(
            json["pagination"],
            json!({
                "totalData": 4,
                "currentPage": 1,
                "totalPages": 2,
                "hasNextPage": true,
                "hasPrevPage": false
            })
        );
        assert_eq!(json["data"], json!([1, 2]));
    }

    proptest::proptest! {
        #[test]
        fn prop_total_pages_cover_all_items(total in 0i64..100_000, limit in 1i64..500, page in 1i64..50) {
            let pagination = Pagination::compute(QueryOptions { page, limit }, total).unwrap();
            proptest::prop_assert!(pagination.total_pages * limit >= total);
            proptest::prop_assert!((pagination.total_pages - 1).max(0) * limit <= total);
            proptest::prop_assert_eq!(pagination.has_next_page, page < pagination.total_pages);
        }
    }
}
