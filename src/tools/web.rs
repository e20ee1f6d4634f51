//! `search_web`, `open_url` and `read_url`.
//!
//! Searches and page reads go through `lucy_search`; URLs are opened in
//! Firefox as a detached process.

use std::sync::Arc;

use async_trait::async_trait;
use lucy_search::SearchConfig;

use super::literal::Literal;
use super::types::{ToolContext, ToolError, ToolHandler, ToolResult, arg_text, tags, truncate_chars};
use crate::exec::spawn_detached;

/// Characters of page text returned to the model.
pub const MAX_PAGE_CHARS: usize = 4000;

const PAGE_TRUNCATION_MARKER: &str = "\n\n[... contenido truncado por longitud ...]";

/// Add `https://` to bare domains.
///
/// Returns `None` when the text is neither a URL nor something that looks
/// like a domain (contains a dot and no spaces).
pub fn normalize_url(input: &str) -> Option<String> {
    let url = input.trim();
    let candidate = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_owned()
    } else if url.contains('.') && !url.contains(' ') {
        format!("https://{url}")
    } else {
        return None;
    };
    url::Url::parse(&candidate)
        .ok()
        .filter(|parsed| parsed.host_str().is_some())
        .map(|_| candidate)
}

/// `search_web(query)`.
#[derive(Debug, Clone)]
pub struct SearchWebTool {
    config: SearchConfig,
}

impl SearchWebTool {
    /// Search with `config`.
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    async fn search(&self, query: &str) -> ToolResult {
        tracing::info!("web search");
        tracing::trace!(query, "web search query");
        match lucy_search::search(query, &self.config).await {
            Ok(results) if results.is_empty() => {
                ToolResult::success(tags::NETWORK, "No encontré resultados para esa búsqueda.")
            }
            Ok(results) => {
                let lines: Vec<String> = results
                    .iter()
                    .map(|r| format!(" - {}: {} (URL: {})", r.title, r.snippet, r.url))
                    .collect();
                ToolResult::success(
                    tags::NETWORK,
                    format!("Resultados de búsqueda para '{query}':\n{}", lines.join("\n")),
                )
            }
            Err(e) => {
                tracing::error!(error = %e, "web search failed");
                ToolResult::failure(tags::NETWORK, format!("Error en la búsqueda web: {e}"))
            }
        }
    }
}

#[async_trait]
impl ToolHandler for SearchWebTool {
    fn description(&self) -> &str {
        "Busca en la web y devuelve los primeros resultados"
    }

    fn parameters(&self) -> &[&'static str] {
        &["query"]
    }

    async fn call(&self, args: &[Literal], _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let Some(query) = arg_text(args, 0) else {
            return Ok(ToolResult::failure(
                tags::NETWORK,
                "Falta la consulta para buscar.",
            ));
        };
        Ok(self.search(&query).await)
    }
}

/// `open_url(url)`. Text that is not a URL is searched instead.
#[derive(Debug, Clone)]
pub struct OpenUrlTool {
    search: Arc<SearchWebTool>,
    browser: String,
}

impl OpenUrlTool {
    /// Open URLs in Firefox, falling back to `search`.
    pub fn new(search: Arc<SearchWebTool>) -> Self {
        Self::with_browser(search, "firefox")
    }

    /// Use a different browser executable.
    pub fn with_browser(search: Arc<SearchWebTool>, browser: impl Into<String>) -> Self {
        Self {
            search,
            browser: browser.into(),
        }
    }
}

#[async_trait]
impl ToolHandler for OpenUrlTool {
    fn description(&self) -> &str {
        "Abre una URL en Firefox"
    }

    fn parameters(&self) -> &[&'static str] {
        &["url"]
    }

    async fn call(&self, args: &[Literal], ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let Some(raw) = arg_text(args, 0) else {
            return Ok(ToolResult::failure(tags::NETWORK, "Falta la URL para abrir."));
        };
        let Some(url) = normalize_url(&raw) else {
            return self.search.call(args, ctx).await;
        };

        tracing::info!(url = %url, browser = %self.browser, "opening url");
        match spawn_detached(&self.browser, &[url.clone()]) {
            Ok(_) => Ok(ToolResult::success(
                tags::NETWORK,
                format!("Abriendo {url} en Firefox."),
            )),
            Err(e) => {
                tracing::error!(error = %e, "failed to launch browser");
                Ok(ToolResult::failure(
                    tags::NETWORK,
                    format!("Error al abrir Firefox: {e}"),
                ))
            }
        }
    }
}

/// `read_url(url)`: download a page and return its readable text.
#[derive(Debug, Clone)]
pub struct ReadUrlTool {
    config: SearchConfig,
}

impl ReadUrlTool {
    /// Fetch pages with `config`.
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ToolHandler for ReadUrlTool {
    fn description(&self) -> &str {
        "Lee y extrae el texto principal de una página web"
    }

    fn parameters(&self) -> &[&'static str] {
        &["url"]
    }

    async fn call(&self, args: &[Literal], _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let Some(raw) = arg_text(args, 0) else {
            return Ok(ToolResult::failure(tags::NETWORK, "Falta la URL para leer."));
        };
        let Some(url) = normalize_url(&raw) else {
            return Ok(ToolResult::failure(
                tags::NETWORK,
                format!("URL inválida: {}", raw.trim()),
            ));
        };

        tracing::info!(url = %url, "reading url");
        match lucy_search::fetch_page_content(&url, &self.config).await {
            Ok(page) if page.text.trim().is_empty() => Ok(ToolResult::failure(
                tags::NETWORK,
                format!("No pude extraer texto de {url}. Puede ser que la página esté protegida."),
            )),
            Ok(page) => Ok(ToolResult::success(
                tags::NETWORK,
                format!(
                    "Contenido de {url}:\n\n{}",
                    truncate_chars(&page.text, MAX_PAGE_CHARS, PAGE_TRUNCATION_MARKER)
                ),
            )),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "page read failed");
                Ok(ToolResult::failure(
                    tags::NETWORK,
                    format!("Error al leer {url}: {e}"),
                ))
            }
        }
    }
}
