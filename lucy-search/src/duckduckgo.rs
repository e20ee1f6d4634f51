//! DuckDuckGo HTML search.
//!
//! Posts the query to the JavaScript-free endpoint and scrapes organic
//! results with CSS selectors. Ads are skipped.

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::http;
use crate::types::SearchResult;
use scraper::{Html, Selector};
use url::Url;

/// Run a query against the configured endpoint.
///
/// # Errors
///
/// Returns [`SearchError::Timeout`], [`SearchError::Status`] or
/// [`SearchError::Http`] when the request fails.
pub async fn search(query: &str, config: &SearchConfig) -> Result<Vec<SearchResult>> {
    tracing::trace!(query, "DuckDuckGo search");

    let client = http::build_client(config)?;
    let mut form = vec![("q", query)];
    if config.safe_search {
        form.push(("kp", "1"));
    }

    let response = client
        .post(&config.endpoint)
        .form(&form)
        .header("Accept-Language", "es-AR,es;q=0.9,en;q=0.8")
        .send()
        .await
        .map_err(|e| SearchError::from_reqwest("DuckDuckGo request", &e))?
        .error_for_status()
        .map_err(|e| SearchError::from_reqwest("DuckDuckGo response", &e))?;

    let html = response
        .text()
        .await
        .map_err(|e| SearchError::from_reqwest("DuckDuckGo body", &e))?;

    parse_results(&html, config.max_results)
}

/// Parse a DuckDuckGo HTML results page.
pub(crate) fn parse_results(html: &str, max_results: usize) -> Result<Vec<SearchResult>> {
    let document = Html::parse_document(html);
    let result_sel = selector(".result:not(.result--ad), .web-result:not(.result--ad)")?;
    let title_sel = selector(".result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let mut results: Vec<SearchResult> = Vec::new();
    for element in document.select(&result_sel) {
        let Some(link) = element.select(&title_sel).next() else {
            continue;
        };
        let title = collapse(&link.text().collect::<String>());
        if title.is_empty() {
            continue;
        }
        let Some(url) = link.value().attr("href").and_then(unwrap_redirect) else {
            continue;
        };
        if results.iter().any(|r| r.url == url) {
            continue;
        }
        let snippet = element
            .select(&snippet_sel)
            .next()
            .map(|s| collapse(&s.text().collect::<String>()))
            .unwrap_or_default();

        results.push(SearchResult {
            title,
            url,
            snippet,
        });
        if results.len() >= max_results {
            break;
        }
    }

    tracing::debug!(count = results.len(), "DuckDuckGo results parsed");
    Ok(results)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| SearchError::Parse(format!("bad selector {css}: {e:?}")))
}

/// Resolve `//duckduckgo.com/l/?uddg=<target>` links to their target.
fn unwrap_redirect(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_owned()
    };
    let parsed = Url::parse(&absolute).ok()?;
    let is_redirect = parsed
        .host_str()
        .is_some_and(|h| h.ends_with("duckduckgo.com"))
        && parsed.path().starts_with("/l/");
    if !is_redirect {
        return Some(absolute);
    }
    parsed
        .query_pairs()
        .find(|(k, _)| k == "uddg")
        .map(|(_, v)| v.into_owned())
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
