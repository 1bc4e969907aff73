//! Credential extraction from request headers.
//!
//! Only the `Bearer` strategy is supported. The `Authorization` header must
//! contain exactly one ASCII space between the scheme and the credential:
//!
//! | Header                | Result             |
//! |-----------------------|--------------------|
//! | absent or empty       | `Missing`          |
//! | `Bearer abc123`       | `Token("abc123")`  |
//! | `bearer abc123`       | `Token("abc123")`  |
//! | `Bearer `             | `Token("")`        |
//! | `Bearer`              | `Invalid`          |
//! | `Bearer  abc123`      | `Invalid`          |
//! | `Basic abc123`        | `Invalid`          |

use crate::types::Request;
use constant_time_eq::constant_time_eq;
use http::header::AUTHORIZATION;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const BEARER: &str = "bearer";

/// The strategy name is not one this crate knows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported auth strategy: {0}")]
pub struct UnsupportedStrategy(pub String);

/// Why no token was extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No credential was sent.
    Missing,
    /// A credential was sent in the wrong shape.
    Invalid,
}

impl Rejection {
    /// The user-facing message for this rejection.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Missing => "missing token",
            Self::Invalid => "invalid token",
        }
    }
}

/// Outcome of extracting a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The credential, verbatim.
    Token(String),
    /// No usable credential.
    Rejected(Rejection),
}

/// A named token extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// `Authorization: Bearer <token>`
    Bearer,
}

impl AuthStrategy {
    /// Returns the canonical strategy name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bearer => "Bearer",
        }
    }

    /// Extracts the credential from `request`.
    #[must_use]
    pub fn extract(self, request: &Request) -> Extraction {
        match self {
            Self::Bearer => extract_bearer(request),
        }
    }
}

impl fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthStrategy {
    type Err = UnsupportedStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bearer" => Ok(Self::Bearer),
            other => Err(UnsupportedStrategy(other.to_string())),
        }
    }
}

/// Extracts a credential using the strategy called `strategy`.
///
/// # Errors
///
/// Returns [`UnsupportedStrategy`] for any name other than `"Bearer"`.
///
/// # Example
///
/// ```
/// use aegis_middleware::stages::token::{extract_token, Extraction};
/// use bytes::Bytes;
/// use http_body_util::Full;
///
/// let request = http::Request::builder()
///     .header("authorization", "Bearer abc123")
///     .body(Full::new(Bytes::new()))
///     .unwrap();
///
/// let extraction = extract_token(&request, "Bearer").unwrap();
/// assert_eq!(extraction, Extraction::Token("abc123".to_string()));
/// assert!(extract_token(&request, "Basic").is_err());
/// ```
pub fn extract_token(request: &Request, strategy: &str) -> Result<Extraction, UnsupportedStrategy> {
    Ok(strategy.parse::<AuthStrategy>()?.extract(request))
}

fn extract_bearer(request: &Request) -> Extraction {
    let Some(value) = request.headers().get(AUTHORIZATION) else {
        return Extraction::Rejected(Rejection::Missing);
    };

    if value.is_empty() {
        return Extraction::Rejected(Rejection::Missing);
    }

    let Ok(value) = std::str::from_utf8(value.as_bytes()) else {
        return Extraction::Rejected(Rejection::Invalid);
    };

    parse_bearer(value)
}

fn parse_bearer(value: &str) -> Extraction {
    let mut parts = value.split(' ');
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return Extraction::Rejected(Rejection::Invalid);
    };

    let scheme = scheme.to_ascii_lowercase();
    if !constant_time_eq(scheme.as_bytes(), BEARER.as_bytes()) {
        return Extraction::Rejected(Rejection::Invalid);
    }

    Extraction::Token(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;
    use proptest::prelude::*;

    fn with_header(value: &str) -> Request {
        http::Request::builder()
            .header(AUTHORIZATION, value)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn extract(value: &str) -> Extraction {
        AuthStrategy::Bearer.extract(&with_header(value))
    }

    #[test]
    fn test_well_formed_bearer() {
        assert_eq!(extract("Bearer abc123"), Extraction::Token("abc123".to_string()));
        assert_eq!(extract("bEaReR abc123"), Extraction::Token("abc123".to_string()));
    }

    #[test]
    fn test_empty_credential_is_valid() {
        assert_eq!(extract("Bearer "), Extraction::Token(String::new()));
    }

    #[test]
    fn test_missing_header() {
        let request = http::Request::new(Full::new(Bytes::new()));
        assert_eq!(
            AuthStrategy::Bearer.extract(&request),
            Extraction::Rejected(Rejection::Missing)
        );
        assert_eq!(extract(""), Extraction::Rejected(Rejection::Missing));
    }

    #[test]
    fn test_wrong_part_count() {
        let invalid = Extraction::Rejected(Rejection::Invalid);
        assert_eq!(extract("Bearer"), invalid);
        assert_eq!(extract("Bearer  abc"), invalid);
        assert_eq!(extract("Bearer abc def"), invalid);
        assert_eq!(extract(" Bearer abc"), invalid);
    }

    #[test]
    fn test_wrong_scheme() {
        assert_eq!(extract("Basic dXNlcjpwYXNz"), Extraction::Rejected(Rejection::Invalid));
        assert_eq!(extract("Bearerx abc"), Extraction::Rejected(Rejection::Invalid));
    }

    #[test]
    fn test_utf8_token_is_returned_unchanged() {
        let value = http::HeaderValue::from_bytes("Bearer café".as_bytes()).unwrap();
        let request = http::Request::builder()
            .header(AUTHORIZATION, value)
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(
            AuthStrategy::Bearer.extract(&request),
            Extraction::Token("café".to_string())
        );
    }

    #[test]
    fn test_invalid_utf8_header_is_invalid() {
        let value = http::HeaderValue::from_bytes(b"Bearer caf\xe9").unwrap();
        let request = http::Request::builder()
            .header(AUTHORIZATION, value)
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(
            AuthStrategy::Bearer.extract(&request),
            Extraction::Rejected(Rejection::Invalid)
        );
    }

    #[test]
    fn test_unsupported_strategy() {
        let request = with_header("Bearer abc");
        assert_eq!(
            extract_token(&request, "Basic"),
            Err(UnsupportedStrategy("Basic".to_string()))
        );
        assert!(extract_token(&request, "bearer").is_err());
        assert!(extract_token(&request, "").is_err());
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(Rejection::Missing.message(), "missing token");
        assert_eq!(Rejection::Invalid.message(), "invalid token");
    }

    proptest! {
        #[test]
        fn prop_bearer_token_returned_verbatim(token in "[!-~]{0,64}") {
            let header = format!("Bearer {token}");
            prop_assert_eq!(extract(&header), Extraction::Token(token));
        }

        #[test]
        fn prop_scheme_is_case_insensitive(scheme in "[bB][eE][aA][rR][eE][rR]", token in "[A-Za-z0-9._-]{1,32}") {
            let header = format!("{scheme} {token}");
            prop_assert_eq!(extract(&header), Extraction::Token(token));
        }

        #[test]
        fn prop_other_schemes_are_invalid(scheme in "[A-Za-z]{1,12}", token in "[A-Za-z0-9]{1,16}") {
            prop_assume!(!scheme.eq_ignore_ascii_case("bearer"));
            let header = format!("{scheme} {token}");
            prop_assert_eq!(extract(&header), Extraction::Rejected(Rejection::Invalid));
        }

        #[test]
        fn prop_part_count_other_than_two_is_invalid(words in prop::collection::vec("[A-Za-z0-9]{0,8}", 1..6)) {
            prop_assume!(words.len() != 2);
            let header = words.join(" ");
            prop_assume!(!header.is_empty());
            prop_assert_eq!(extract(&header), Extraction::Rejected(Rejection::Invalid));
        }
    }
}
