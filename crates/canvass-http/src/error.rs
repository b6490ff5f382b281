//! API client error types

use thiserror::Error;

/// Result type for API client operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors surfaced to dashboard callers.
///
/// Every variant's `Display` output is a message suitable for showing to the
/// end user directly; diagnostic detail rides along in the variant fields.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend could not be reached at the transport level
    #[error("cannot reach the server at {url}: {detail}")]
    Connectivity {
        /// Resolved base address the call targeted
        url: String,
        /// Underlying transport error text, plus the configured origin when known
        detail: String,
    },

    /// A 401 that could not be recovered by a token refresh
    #[error("session expired, please sign in again")]
    SessionExpired,

    /// Any other non-success HTTP status
    #[error("{message}")]
    Status {
        status: reqwest::StatusCode,
        /// Message extracted from the server's error envelope, or a generic fallback
        message: String,
    },

    /// The configured base address is not a valid URL
    #[error("invalid base address: {0}")]
    InvalidBaseUrl(String),

    /// The request path could not be joined onto the base address
    #[error("invalid request path: {0}")]
    InvalidPath(String),

    /// A caller-supplied header name or value is not sendable
    #[error("invalid request header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// A successful response body could not be decoded as the expected type
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The token store failed while reading or clearing credentials
    #[error(transparent)]
    Store(#[from] canvass_session::StoreError),
}

impl ApiError {
    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error means the user must authenticate again
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_accessor() {
        let err = ApiError::Status {
            status: reqwest::StatusCode::NOT_FOUND,
            message: "missing".to_string(),
        };
        assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
        assert!(ApiError::SessionExpired.status().is_none());
    }

    #[test]
    fn test_display_is_user_presentable() {
        let err = ApiError::Connectivity {
            url: "http://127.0.0.1:8000/".to_string(),
            detail: "connection refused".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("http://127.0.0.1:8000/"));
        assert!(text.contains("connection refused"));
    }
}
