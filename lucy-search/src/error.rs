//! Error types for the lucy-search crate.
//!
//! Messages are stable and safe to show to users. Query text never
//! appears in an error.

/// Errors that can occur while searching or reading a page.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The remote server answered with a non-success status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// The response HTML did not contain what we were looking for.
    #[error("parse error: {0}")]
    Parse(String),

    /// The URL is malformed or uses an unsupported scheme.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl SearchError {
    /// Classify a [`reqwest::Error`] into the matching variant.
    pub(crate) fn from_reqwest(context: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout(context.to_owned());
        }
        if let Some(status) = err.status() {
            return Self::Status(status.as_u16());
        }
        Self::Http(format!("{context}: {err}"))
    }
}

/// Convenience type alias for lucy-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_timeout() {
        let err = SearchError::Timeout("page fetch".into());
        assert_eq!(err.to_string(), "request timed out: page fetch");
    }

    #[test]
    fn display_status() {
        assert_eq!(SearchError::Status(503).to_string(), "HTTP status 503");
    }

    #[test]
    fn display_invalid_url() {
        let err = SearchError::InvalidUrl("ftp://example.com".into());
        assert_eq!(err.to_string(), "invalid URL: ftp://example.com");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SearchError>();
    }
}
