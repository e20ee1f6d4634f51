//! Errors produced by language model backends.
//!
//! Each variant carries a stable code (SCREAMING_SNAKE_CASE) that is part
//! of the Display output and available through [`LlmError::code()`].

/// Stable error codes.
pub mod error_codes {
    /// Invalid or missing backend configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
    /// The backend could not be reached.
    pub const CONNECTION_FAILED: &str = "CONNECTION_FAILED";
    /// The request did not finish in time.
    pub const TIMEOUT_ERROR: &str = "TIMEOUT_ERROR";
    /// The backend answered with a non-success HTTP status.
    pub const HTTP_STATUS: &str = "HTTP_STATUS";
    /// The response body could not be understood.
    pub const RESPONSE_INVALID: &str = "RESPONSE_INVALID";
    /// The CLI gateway exited unsuccessfully or produced nothing usable.
    pub const GATEWAY_FAILED: &str = "GATEWAY_FAILED";
}

/// Errors produced by [`LlmProvider`](super::LlmProvider) implementations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Invalid or missing backend configuration.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    Config(String),

    /// The backend could not be reached (connection refused, DNS, reset).
    #[error("[{}] {}", error_codes::CONNECTION_FAILED, .0)]
    Connection(String),

    /// The request did not finish in time.
    #[error("[{}] {}", error_codes::TIMEOUT_ERROR, .0)]
    Timeout(String),

    /// The backend answered with a non-success HTTP status.
    #[error("[{}] {status}: {message}", error_codes::HTTP_STATUS)]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The response body could not be understood.
    #[error("[{}] {}", error_codes::RESPONSE_INVALID, .0)]
    InvalidResponse(String),

    /// The CLI gateway exited unsuccessfully or produced nothing usable.
    #[error("[{}] {}", error_codes::GATEWAY_FAILED, .0)]
    Gateway(String),
}

impl LlmError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => error_codes::CONFIG_INVALID,
            Self::Connection(_) => error_codes::CONNECTION_FAILED,
            Self::Timeout(_) => error_codes::TIMEOUT_ERROR,
            Self::Status { .. } => error_codes::HTTP_STATUS,
            Self::InvalidResponse(_) => error_codes::RESPONSE_INVALID,
            Self::Gateway(_) => error_codes::GATEWAY_FAILED,
        }
    }

    /// Returns the message without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Config(m)
            | Self::Connection(m)
            | Self::Timeout(m)
            | Self::InvalidResponse(m)
            | Self::Gateway(m) => m,
            Self::Status { message, .. } => message,
        }
    }

    /// Returns true when retrying the same request may succeed.
    ///
    /// Configuration errors and 4xx statuses (other than 429) are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Connection(_) | Self::Timeout(_) | Self::Gateway(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidResponse(_) => true,
        }
    }

    /// Returns true for failures to reach the backend at all, which get a
    /// distinct apology from the orchestrator.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }

    /// Classify a [`reqwest::Error`].
    pub(crate) fn from_reqwest(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("{context}: {err}"))
        } else if err.is_connect() {
            Self::Connection(format!("{context}: {err}"))
        } else if err.is_decode() {
            Self::InvalidResponse(format!("{context}: {err}"))
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                message: context.to_owned(),
            }
        } else {
            Self::Connection(format!("{context}: {err}"))
        }
    }
}
