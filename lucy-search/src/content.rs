//! Readable-text extraction from raw HTML.
//!
//! Walks the parsed DOM instead of the raw markup, so boilerplate
//! subtrees (scripts, navigation, forms) are skipped wholesale and block
//! elements become line breaks.

use crate::error::{Result, SearchError};
use crate::types::PageContent;
use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose whole subtree never contributes readable text.
const SKIPPED: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "canvas", "iframe", "nav", "header",
    "footer", "aside", "form", "button", "select",
];

/// Elements that start a new line in the extracted text.
const BLOCKS: &[&str] = &[
    "p", "div", "section", "article", "main", "br", "li", "ul", "ol", "tr", "table", "h1", "h2",
    "h3", "h4", "h5", "h6", "pre", "blockquote", "figcaption", "dd", "dt",
];

/// Content roots, most specific first.
const ROOTS: &[&str] = &["article", "main", "[role=\"main\"]", "body"];

/// Extract the title and readable text from an HTML document.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if the document has no readable text.
pub fn extract_content(html: &str, url: &str) -> Result<PageContent> {
    let document = Html::parse_document(html);
    let title = extract_title(&document);

    let text = ROOTS
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .filter_map(|sel| document.select(&sel).next())
        .map(|root| {
            let mut raw = String::new();
            collect_text(root, &mut raw);
            normalise(&raw)
        })
        .find(|t| !t.is_empty())
        .ok_or_else(|| SearchError::Parse("no extractable content found".into()))?;

    let word_count = text.split_whitespace().count();
    Ok(PageContent {
        url: url.to_owned(),
        title,
        text,
        word_count,
    })
}

fn extract_title(document: &Html) -> String {
    let Ok(sel) = Selector::parse("title") else {
        return String::new();
    };
    document
        .select(&sel)
        .next()
        .map(|t| normalise(&t.text().collect::<String>()))
        .unwrap_or_default()
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if SKIPPED.contains(&name) {
                continue;
            }
            let block = BLOCKS.contains(&name);
            if block {
                out.push('\n');
            }
            collect_text(child_el, out);
            if block {
                out.push('\n');
            }
        } else if let Node::Text(text) = child.value() {
            out.push_str(text);
        }
    }
}

/// Collapse runs of spaces inside lines and keep at most one blank line
/// between paragraphs.
fn normalise(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut blank = false;
    for line in raw.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank = !lines.is_empty();
            continue;
        }
        if blank {
            lines.push(String::new());
            blank = false;
        }
        lines.push(collapsed);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_and_body() {
        let html = "<html><head><title> My  Page </title></head><body>Hello there</body></html>";
        let page = extract_content(html, "https://example.com").unwrap();
        assert_eq!(page.title, "My Page");
        assert_eq!(page.text, "Hello there");
        assert_eq!(page.word_count, 2);
        assert_eq!(page.url, "https://example.com");
    }

    #[test]
    fn prefers_article_over_body() {
        let html = r#"<html><body>
            <div>Outer noise</div>
            <article><h1>Title</h1><p>Article body.</p></article>
        </body></html>"#;
        let page = extract_content(html, "u").unwrap();
        assert!(page.text.contains("Article body."));
        assert!(!page.text.contains("Outer noise"));
    }

    #[test]
    fn skips_boilerplate_subtrees() {
        let html = r#"<html><body>
            <header>Site header</header>
            <nav><a href="/">Home</a></nav>
            <p>Real content</p>
            <script>var tracking = 1;</script>
            <style>.x { color: red }</style>
            <footer>Copyright</footer>
        </body></html>"#;
        let page = extract_content(html, "u").unwrap();
        assert_eq!(page.text, "Real content");
    }

    #[test]
    fn block_elements_become_lines() {
        let html = "<html><body><p>One</p><p>Two</p><ul><li>a</li><li>b</li></ul></body></html>";
        let page = extract_content(html, "u").unwrap();
        let lines: Vec<&str> = page.text.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(lines, vec!["One", "Two", "a", "b"]);
    }

    #[test]
    fn inline_elements_stay_on_one_line() {
        let html = "<html><body><p>Hello <b>bold</b> world</p></body></html>";
        let page = extract_content(html, "u").unwrap();
        assert_eq!(page.text, "Hello bold world");
    }

    #[test]
    fn only_scripts_is_an_error() {
        let html = "<html><body><script>console.log(1)</script></body></html>";
        let err = extract_content(html, "u").unwrap_err();
        assert!(err.to_string().contains("no extractable content"));
    }

    #[test]
    fn empty_document_is_an_error() {
        assert!(extract_content("", "u").is_err());
    }

    #[test]
    fn normalise_limits_blank_lines() {
        assert_eq!(normalise("a  b\n\n\n\n c \n"), "a b\n\nc");
    }
}
