//! Bot API error types

use std::time::Duration;

/// Errors that can occur while talking to the Telegram Bot API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Non-JSON HTTP error response.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// The API answered with `"ok": false`.
    #[error("Telegram error {code}: {description}")]
    Telegram {
        /// Telegram error code (mirrors the HTTP status).
        code: u16,
        /// Human-readable description from Telegram.
        description: String,
        /// Flood-control delay requested by Telegram.
        retry_after: Option<Duration>,
    },

    /// Network error during API call.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// Invalid base URL or method name.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse API response.
    #[error("Response parse error: {message}")]
    Parse {
        /// Description of the parse error.
        message: String,
        /// Raw response body, if available.
        body: Option<String>,
    },
}

impl ApiError {
    /// Creates a new HTTP error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates a new Telegram error without flood-control information.
    pub fn telegram(code: u16, description: impl Into<String>) -> Self {
        Self::Telegram {
            code,
            description: description.into(),
            retry_after: None,
        }
    }

    /// Creates a new parse error with the raw response body.
    pub fn parse_with_body(message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            body: Some(body.into()),
        }
    }

    /// Returns the HTTP status (or Telegram error code) if there is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Telegram { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns the delay Telegram asked us to wait before retrying.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Telegram { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Returns `true` if this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } | Self::Telegram { code: status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
            }
            Self::Network(_) => true,
            Self::Timeout(_) => true,
            _ => false,
        }
    }
}
