//! Result types returned by searches and page reads.

use serde::{Deserialize, Serialize};

/// A single organic search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The title of the result page.
    pub title: String,
    /// The destination URL, with any engine redirect wrapper removed.
    pub url: String,
    /// Text snippet shown under the title. May be empty.
    pub snippet: String,
}

/// Readable content extracted from a fetched web page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    /// The URL that was fetched.
    pub url: String,
    /// The page title, empty when the document has none.
    pub title: String,
    /// Readable text with boilerplate removed and whitespace normalised.
    pub text: String,
    /// Number of whitespace-separated words in `text`.
    pub word_count: usize,
}
