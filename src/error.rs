//! Error types for the session-aware client

use std::sync::Arc;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Result alias used across the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Client error taxonomy
///
/// `Error` is `Clone` so a single refresh outcome can be handed to every
/// caller queued behind it. Non-clonable sources are kept behind `Arc`.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Refresh attempted with no refresh token in durable storage
    #[error("No refresh token stored; please log in again")]
    NoRefreshToken,

    /// Backend rejected the refresh token (expired or revoked)
    #[error("Session expired ({status}): {message}")]
    RefreshRejected {
        /// HTTP status returned by `/auth/refresh`
        status: u16,
        /// Server-supplied message, if any
        message: String,
    },

    /// The retried request was still unauthorized
    #[error("Session expired, please log in again")]
    AuthExpired,

    /// Any non-401 error response from the backend
    #[error("API error {status} ({code}): {message}")]
    Api {
        /// Server error code, or `HTTP_<status>` when none was supplied
        code: String,
        /// Human readable message
        message: String,
        /// HTTP status
        status: u16,
    },

    /// Connectivity failure (no response)
    #[error("Network error: {0}")]
    Network(#[source] Arc<reqwest::Error>),

    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Durable credential storage failed
    #[error("Credential storage error: {0}")]
    Storage(String),

    /// The refresh task ended without reporting an outcome
    #[error("Token refresh was interrupted")]
    Interrupted,

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// True for failures that mean the user has to log in again
    pub const fn is_session_expired(&self) -> bool {
        matches!(
            self,
            Self::NoRefreshToken | Self::RefreshRejected { .. } | Self::AuthExpired
        )
    }

    /// True for connectivity or timeout failures
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout)
    }

    /// HTTP status attached to this error, if any
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::RefreshRejected { status, .. } => Some(*status),
            Self::AuthExpired => Some(401),
            _ => None,
        }
    }

    /// Build an [`Error::Api`] from a failed response body
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let (code, message) = parse_error_body(status, body);
        Self::Api {
            code,
            message,
            status: status.as_u16(),
        }
    }

    pub(crate) fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(Arc::new(err))
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Backend error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Extract `(code, message)` from an error body, falling back to the status
pub(crate) fn parse_error_body(status: StatusCode, body: &str) -> (String, String) {
    let fallback_code = format!("HTTP_{}", status.as_u16());

    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let code = envelope.error.code.unwrap_or(fallback_code);
        let message = envelope
            .error
            .message
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
        return (code, message);
    }

    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        body.trim().to_string()
    };

    (fallback_code, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_error_body() {
        let body = r#"{"error":{"code":"POST_NOT_FOUND","message":"Post does not exist"}}"#;
        let err = Error::from_response(StatusCode::NOT_FOUND, body);

        match err {
            Error::Api {
                code,
                message,
                status,
            } => {
                assert_eq!(code, "POST_NOT_FOUND");
                assert_eq!(message, "Post does not exist");
                assert_eq!(status, 404);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_plain_error_body() {
        let (code, message) = parse_error_body(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(code, "HTTP_502");
        assert_eq!(message, "upstream down");
    }

    #[test]
    fn test_empty_error_body_uses_reason() {
        let (code, message) = parse_error_body(StatusCode::FORBIDDEN, "");
        assert_eq!(code, "HTTP_403");
        assert_eq!(message, "Forbidden");
    }

    #[test]
    fn test_session_expired_classification() {
        assert!(Error::NoRefreshToken.is_session_expired());
        assert!(Error::AuthExpired.is_session_expired());
        assert!(
            Error::RefreshRejected {
                status: 401,
                message: String::new()
            }
            .is_session_expired()
        );
        assert!(!Error::Timeout.is_session_expired());
        assert!(Error::Timeout.is_network());
        assert!(
            !Error::Api {
                code: "X".into(),
                message: String::new(),
                status: 500
            }
            .is_network()
        );
    }
}
