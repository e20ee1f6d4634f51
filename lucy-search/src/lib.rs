//! # lucy-search
//!
//! Key-free web search and page reading for Lucy.
//!
//! Searches scrape DuckDuckGo's HTML endpoint, so there are no API keys
//! to configure. Page reads download a URL and reduce it to readable
//! text for the language model.
//!
//! Queries are logged at trace level only.

pub mod config;
pub mod content;
pub mod duckduckgo;
pub mod error;
pub mod fetch;
pub mod http;
pub mod types;

pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use types::{PageContent, SearchResult};

/// Search the web.
///
/// # Errors
///
/// Returns [`SearchError::Config`] for an invalid configuration, or the
/// request error from the engine.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> lucy_search::Result<()> {
/// let config = lucy_search::SearchConfig::default();
/// for r in lucy_search::search("clima en Rosario", &config).await? {
///     println!("{}: {}", r.title, r.url);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search(query: &str, config: &SearchConfig) -> Result<Vec<SearchResult>> {
    config.validate()?;
    duckduckgo::search(query, config).await
}

/// Fetch a page and extract its readable text.
///
/// # Errors
///
/// See [`fetch::fetch_page`].
pub async fn fetch_page_content(url: &str, config: &SearchConfig) -> Result<PageContent> {
    config.validate()?;
    fetch::fetch_page(url, config).await
}
