//! Error types for the MediaWiki API client.
//!
//! # Design
//! One variant per failure kind a caller may want to branch on. `NotFound`
//! and `WrongPassword` are split out of `Api` because callers routinely
//! handle "no such user" and "bad credentials" differently from other
//! server-side codes. `MalformedResponse` means the server answered with
//! something this library does not understand, usually an API version
//! mismatch; retrying will not help.

use thiserror::Error;

use crate::config::ConfigError;

/// Boxed cause carried by transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by `ApiClient` parse methods and `MediaWiki` operations.
#[derive(Debug, Error)]
pub enum MediaWikiError {
    /// The request never produced an HTTP response (connection refused,
    /// DNS failure, timeout, broken body).
    #[error("request failed: {0}")]
    Request(#[source] BoxError),

    /// The server answered with a status other than 200.
    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    /// A field or array the API always returns was missing or had the
    /// wrong shape.
    #[error("malformed API response: {0}")]
    MalformedResponse(String),

    /// The API returned a structured `error.code`.
    #[error("API error: {code}")]
    Api { code: String },

    /// The queried user or page does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Login was rejected because of the password.
    #[error("wrong password for user {0}")]
    WrongPassword(String),

    /// A caller-supplied argument cannot be turned into a request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A session was requested with a configuration that fails validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MediaWikiError {
    /// Wrap any transport-level failure.
    pub fn request<E>(cause: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Request(cause.into())
    }

    /// The MediaWiki error code, for `Api` errors.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code } => Some(code),
            _ => None,
        }
    }
}

pub type Result<T, E = MediaWikiError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_payload() {
        let err = MediaWikiError::Http {
            status: 503,
            reason: "Service Unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");

        let err = MediaWikiError::Api {
            code: "readapidenied".to_string(),
        };
        assert_eq!(err.to_string(), "API error: readapidenied");
        assert_eq!(err.code(), Some("readapidenied"));
    }

    #[test]
    fn request_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = MediaWikiError::request(io);
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.code(), None);
    }
}
