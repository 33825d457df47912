//! RSS 2.0 / RSS 1.0 / Atom parsing.
//!
//! Feeds are parsed strictly with `roxmltree` first. Real-world feeds are
//! often broken (unescaped `&`, unclosed tags), so [`fallback_link`] recovers
//! the newest link from raw text when the strict parse fails.

use std::sync::LazyLock;

use regex::Regex;
use roxmltree::{Document, Node, ParsingOptions};

use curation_shared::{CurationError, Result};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which syndication dialect a document used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Rss,
    Atom,
}

/// One `<item>` or `<entry>`, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
}

/// A strictly parsed feed.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub kind: FeedKind,
    pub items: Vec<FeedItem>,
}

// ---------------------------------------------------------------------------
// Strict parse
// ---------------------------------------------------------------------------

/// Parse a feed body. Unknown root elements are a parse error.
pub(crate) fn parse_feed(body: &str) -> Result<ParsedFeed> {
    let body = body.trim_start_matches('\u{feff}').trim_start();
    let opts = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(body, opts)
        .map_err(|e| CurationError::parse(format!("invalid feed XML: {e}")))?;

    let root = doc.root_element();
    match root.tag_name().name() {
        // RSS 2.0 nests items under <channel>; RSS 1.0 (RDF) puts them beside it.
        "rss" | "RDF" => Ok(ParsedFeed {
            kind: FeedKind::Rss,
            items: elements_named(root, "item").map(rss_item).collect(),
        }),
        "feed" => Ok(ParsedFeed {
            kind: FeedKind::Atom,
            items: elements_named(root, "entry").map(atom_entry).collect(),
        }),
        other => Err(CurationError::parse(format!(
            "unrecognised feed root element <{other}>"
        ))),
    }
}

fn elements_named<'a, 'input>(
    root: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    root.descendants()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// Concatenated text of a node, CDATA included, trimmed. Empty is `None`.
fn text_of(node: Node<'_, '_>) -> Option<String> {
    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn rss_item(node: Node<'_, '_>) -> FeedItem {
    FeedItem {
        title: child(node, "title").and_then(text_of),
        link: child(node, "link").and_then(text_of),
        description: child(node, "description").and_then(text_of),
    }
}

fn atom_entry(node: Node<'_, '_>) -> FeedItem {
    let links: Vec<Node<'_, '_>> = node
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "link")
        .collect();
    // rel defaults to "alternate" when absent.
    let link = links
        .iter()
        .find(|l| l.attribute("rel").is_none_or(|rel| rel == "alternate"))
        .or_else(|| links.first())
        .and_then(|l| l.attribute("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty());

    FeedItem {
        title: child(node, "title").and_then(text_of),
        link,
        description: child(node, "summary")
            .or_else(|| child(node, "content"))
            .and_then(text_of),
    }
}

// ---------------------------------------------------------------------------
// Fallback for malformed XML
// ---------------------------------------------------------------------------

/// `<link>...</link>` body, lazily.
static RSS_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<link>(.*?)</link>").expect("rss link regex"));

/// `href="..."` inside an Atom `<link ...>` tag.
static ATOM_HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<link\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#).expect("atom href regex")
});

/// Recover the first item's link from a body that failed strict parsing.
///
/// Only text after the first `<item` / `<entry` is searched, so the channel's
/// own homepage link is never mistaken for an article.
pub(crate) fn fallback_link(body: &str) -> Option<String> {
    if let Some(pos) = find_open_tag(body, "item") {
        let raw = RSS_LINK_RE.captures(&body[pos..])?.get(1)?.as_str();
        return clean_link(raw);
    }
    if let Some(pos) = find_open_tag(body, "entry") {
        let raw = ATOM_HREF_RE.captures(&body[pos..])?.get(1)?.as_str();
        return clean_link(raw);
    }
    None
}

fn find_open_tag(body: &str, name: &str) -> Option<usize> {
    let needle = format!("<{name}");
    body.match_indices(&needle).map(|(i, _)| i).find(|&i| {
        matches!(
            body[i + needle.len()..].chars().next(),
            Some('>' | ' ' | '\t' | '\r' | '\n')
        )
    })
}

fn clean_link(raw: &str) -> Option<String> {
    let mut link = raw.trim();
    if let Some(inner) = link
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
    {
        link = inner.trim();
    }
    (!link.is_empty()).then(|| link.to_string())
}
