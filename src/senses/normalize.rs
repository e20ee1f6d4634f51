//! Clean assistant text before it is spoken.
//!
//! Markdown markers, links and URLs would be read out literally by the
//! synthesizer; this strips them while keeping the words.

use std::sync::LazyLock;

use regex::Regex;

static MD_LINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").ok());
static BARE_URL: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"https?://\S+").ok());
static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[\s\x{A0}]+").ok());
static SPACE_COMMA: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+,").ok());
static DOUBLE_COMMA: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r",\s+,").ok());
static ELLIPSIS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\.{3,}").ok());

fn replace(re: &LazyLock<Option<Regex>>, text: &str, with: &str) -> String {
    match re.as_ref() {
        Some(re) => re.replace_all(text, with).into_owned(),
        None => text.to_owned(),
    }
}

/// Make `text` sound natural when read aloud.
pub fn normalize_for_tts(text: &str) -> String {
    let t = text.trim();
    if t.is_empty() {
        return String::new();
    }

    let t = t
        .replace("```", " ")
        .replace('`', "")
        .replace("**", "")
        .replace('*', "")
        .replace("__", "")
        .replace('_', "")
        .replace('•', "-");
    let t = replace(&MD_LINK, &t, "$1");
    let t = replace(&BARE_URL, &t, "");
    let t = t.replace('(', ", ").replace(')', ", ");

    let t = replace(&WHITESPACE, &t, " ");
    let t = replace(&SPACE_COMMA, &t, ",");
    let t = replace(&DOUBLE_COMMA, &t, ", ");
    let t = replace(&ELLIPSIS, &t, "…");

    t.trim_matches(|c| c == ' ' || c == ',').to_owned()
}
