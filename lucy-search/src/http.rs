//! HTTP client used by searches and page reads.
//!
//! Requests look like a Spanish-speaking desktop browser: a rotating
//! User-Agent, `Accept-Language` preferring Spanish and a cookie jar.
//! Every client carries the configured timeout.

use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};

use crate::config::SearchConfig;
use crate::error::SearchError;

const BROWSER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

const LANGUAGES: &str = "es-AR,es;q=0.9,en;q=0.6";
const HTML_ACCEPT: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";

/// Build a client for one search or page read.
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, SearchError> {
    let agent = match &config.user_agent {
        Some(agent) => agent.clone(),
        None => pick_user_agent().to_owned(),
    };
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(LANGUAGES));
    headers.insert(ACCEPT, HeaderValue::from_static(HTML_ACCEPT));

    let timeout = Duration::from_secs(config.timeout_seconds);
    reqwest::Client::builder()
        .default_headers(headers)
        .user_agent(agent)
        .cookie_store(true)
        .connect_timeout(timeout)
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| SearchError::Http(format!("cannot build client: {e}")))
}

/// A browser User-Agent, chosen at random.
pub fn pick_user_agent() -> &'static str {
    BROWSER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(BROWSER_AGENTS[0])
}
