//! Error types for the channel ticker

use thiserror::Error;

/// Errors that can occur when fetching a metric from an upstream API
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(reqwest::Error),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Upstream answered with a non-success status
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Body decoded but the expected field is absent or unusable
    #[error("Missing field: {0}")]
    MissingField(String),
}

impl FetchError {
    /// Maps a transport error, separating timeouts from other failures
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::NetworkError(err)
        }
    }

    /// True for failures caused by the network or the upstream being unhealthy,
    /// false for schema problems in an otherwise successful response
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::NetworkError(_)
            | FetchError::Timeout
            | FetchError::RateLimitExceeded
            | FetchError::HttpStatus { .. } => true,
            FetchError::InvalidResponse(_) | FetchError::MissingField(_) => false,
        }
    }
}

/// Errors that can occur when publishing a label to a channel
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PublishError {
    /// Channel does not exist (stale identifier)
    #[error("Channel not found: {0}")]
    NotFound(String),

    /// Credential rejected for this request
    #[error("Unauthorized for channel {0}")]
    Unauthorized(String),

    /// Bot lacks the permission to view or manage the channel
    #[error("Forbidden for channel {0}")]
    Forbidden(String),

    /// Platform rate limit hit
    #[error("Rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<f64> },

    /// Name rejected by the platform or by the local length check
    #[error("Invalid channel name: {0}")]
    InvalidName(String),

    /// Transport failure talking to the platform
    #[error("Network error: {0}")]
    Network(String),

    /// Any other platform error
    #[error("Platform API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

/// Errors that abort the process before the first pass
#[derive(Debug, Error)]
pub enum StartupError {
    /// Required credential not present in the environment
    #[error("Missing credential: set {0}")]
    MissingCredential(&'static str),

    /// Credential contains characters that cannot be sent in a header
    #[error("Credential is not a valid header value")]
    InvalidCredential,

    /// Platform refused the login
    #[error("Login rejected: {0}")]
    LoginRejected(String),

    /// Transport failure during login
    #[error("Network error during login: {0}")]
    Network(#[from] reqwest::Error),
}
