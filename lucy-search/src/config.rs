//! Search configuration with sensible defaults.

use crate::error::SearchError;

/// DuckDuckGo's JavaScript-free results endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Configuration for searches and page fetches.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Results endpoint. Overridable so tests can point at a local server.
    pub endpoint: String,
    /// Maximum number of results to return.
    pub max_results: usize,
    /// HTTP request timeout in seconds, applied to every request.
    pub timeout_seconds: u64,
    /// Ask the engine for safe-search filtering.
    pub safe_search: bool,
    /// Custom User-Agent string. If `None`, one is picked from a built-in
    /// list of browser User-Agents per client.
    pub user_agent: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            max_results: 5,
            timeout_seconds: 10,
            safe_search: true,
            user_agent: None,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] when `max_results` or
    /// `timeout_seconds` is zero, or when `endpoint` is not an http(s) URL.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_results == 0 {
            return Err(SearchError::Config(
                "max_results must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        match url::Url::parse(&self.endpoint) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(()),
            _ => Err(SearchError::Config(format!(
                "endpoint is not an http(s) URL: {}",
                self.endpoint
            ))),
        }
    }
}
