//! HTML page helpers: titles, plain text, and prompt-ready article text.

use scraper::{Html, Selector};
use tracing::debug;

use curation_shared::{CurationError, Result};

/// Best display title for a page: `og:title`, then `<title>`, then the first `<h1>`.
pub fn extract_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    let og = Selector::parse(r#"meta[property="og:title"]"#).ok()?;
    if let Some(content) = doc
        .select(&og)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .find(|t| !t.is_empty())
    {
        return Some(content);
    }

    ["title", "h1"].iter().find_map(|tag| first_text(&doc, tag))
}

fn first_text(doc: &Html, tag: &str) -> Option<String> {
    let selector = Selector::parse(tag).ok()?;
    doc.select(&selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|t| !t.is_empty())
}

/// Plain text of an HTML fragment, whitespace collapsed.
pub fn strip_tags(fragment: &str) -> String {
    let doc = Html::parse_fragment(fragment);
    collapse_whitespace(&doc.root_element().text().collect::<String>())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` characters of `text`; never splits a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Convert an article page into Markdown for prompting, capped at `max_chars`.
///
/// Prefers `<article>`, then `<main>`, then `<body>`. Chrome such as scripts,
/// navigation, and footers is dropped.
pub fn article_markdown(html: &str, max_chars: usize) -> Result<String> {
    let content_html = main_content_html(html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec![
            "script", "style", "nav", "header", "footer", "aside", "iframe", "noscript",
            "svg", "form",
        ])
        .build();
    let markdown = converter
        .convert(&content_html)
        .map_err(|e| CurationError::parse(format!("htmd conversion failed: {e}")))?;

    let markdown = markdown.trim();
    let kept = truncate_chars(markdown, max_chars);
    debug!(
        chars = markdown.chars().count(),
        kept = kept.chars().count(),
        "article converted"
    );
    Ok(kept.to_string())
}

fn main_content_html(html: &str) -> String {
    let doc = Html::parse_document(html);
    for tag in ["article", "main", "body"] {
        if let Ok(selector) = Selector::parse(tag) {
            if let Some(el) = doc.select(&selector).next() {
                return el.inner_html();
            }
        }
    }
    html.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[test]
    fn og_title_wins() {
        let html = load_fixture("article.html");
        assert_eq!(
            extract_title(&html).as_deref(),
            Some("The Aggregator's Dilemma")
        );
    }

    #[test]
    fn title_tag_then_h1() {
        assert_eq!(
            extract_title("<html><head><title>  Page\n Title </title></head></html>").as_deref(),
            Some("Page Title")
        );
        assert_eq!(
            extract_title("<html><body><h1>Heading</h1></body></html>").as_deref(),
            Some("Heading")
        );
        assert_eq!(extract_title("<html><body><p>none</p></body></html>"), None);
    }

    #[test]
    fn strip_tags_keeps_text() {
        assert_eq!(
            strip_tags("<p>Aggregators win by owning <em>demand</em>.</p>"),
            "Aggregators win by owning demand."
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("深度摘要", 2), "深度");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn article_markdown_drops_chrome() {
        let md = article_markdown(&load_fixture("article.html"), 50_000).unwrap();
        assert!(md.contains("Aggregation Theory"));
        assert!(!md.contains("Subscribe to the newsletter"));
        assert!(!md.contains("trackPageview"));
    }

    #[test]
    fn article_markdown_is_capped() {
        let md = article_markdown(&load_fixture("article.html"), 40).unwrap();
        assert_eq!(md.chars().count(), 40);
    }
}
