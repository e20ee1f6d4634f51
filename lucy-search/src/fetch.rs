//! Page download for the readable-text extractor.

use crate::config::SearchConfig;
use crate::content;
use crate::error::{Result, SearchError};
use crate::http;
use crate::types::PageContent;
use url::Url;

/// Download `url` and extract its readable text.
///
/// # Errors
///
/// Returns [`SearchError::InvalidUrl`] for non-http(s) URLs, the request
/// variants for network failures, and [`SearchError::Parse`] when the page
/// has no readable text.
pub async fn fetch_page(url: &str, config: &SearchConfig) -> Result<PageContent> {
    let parsed = Url::parse(url).map_err(|e| SearchError::InvalidUrl(format!("{url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SearchError::InvalidUrl(url.to_owned()));
    }

    let client = http::build_client(config)?;
    let response = client
        .get(parsed.as_str())
        .send()
        .await
        .map_err(|e| SearchError::from_reqwest("page request", &e))?
        .error_for_status()
        .map_err(|e| SearchError::from_reqwest("page response", &e))?;

    let html = response
        .text()
        .await
        .map_err(|e| SearchError::from_reqwest("page body", &e))?;
    tracing::debug!(bytes = html.len(), "page downloaded");

    content::extract_content(&html, url)
}
