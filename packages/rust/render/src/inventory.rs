//! Archive inventory lists.

use scraper::{Html, Selector};

use curation_shared::InventoryEntry;

use crate::escape_html;
use crate::podcast::highlighted_title;

pub const EMPTY_DAILY_LABEL: &str = "尚無日報存檔";
pub const EMPTY_PODCAST_LABEL: &str = "尚無 Podcast 存檔";

/// Label for a podcast snapshot that carries no recognisable title.
pub const DEFAULT_SNAPSHOT_TITLE: &str = "Podcast 深度摘要";

const INDENT: &str = "\n                ";

/// Render `<li>` links, one per line, or a single placeholder item.
pub fn render_inventory(entries: &[InventoryEntry], empty_label: &str) -> String {
    if entries.is_empty() {
        return format!("<li>{}</li>{INDENT}", escape_html(empty_label));
    }

    let items: Vec<String> = entries
        .iter()
        .map(|e| {
            format!(
                r#"<li><a href="{}">{}</a></li>"#,
                escape_html(&e.href),
                escape_html(&e.label)
            )
        })
        .collect();
    format!("{INDENT}{}{INDENT}", items.join(INDENT))
}

/// Inventory label for an archived page: its highlighted episode, else its
/// first `<h3>`, else [`DEFAULT_SNAPSHOT_TITLE`].
pub fn snapshot_title(html: &str) -> String {
    highlighted_title(html)
        .or_else(|| first_h3(html))
        .unwrap_or_else(|| DEFAULT_SNAPSHOT_TITLE.to_string())
}

fn first_h3(html: &str) -> Option<String> {
    let selector = Selector::parse("h3").ok()?;
    let doc = Html::parse_document(html);
    doc.select(&selector)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(label: &str, href: &str) -> InventoryEntry {
        InventoryEntry {
            label: label.into(),
            href: href.into(),
        }
    }

    #[test]
    fn empty_inventory_shows_placeholder() {
        assert_eq!(
            render_inventory(&[], EMPTY_DAILY_LABEL),
            "<li>尚無日報存檔</li>\n                "
        );
    }

    #[test]
    fn entries_one_per_line() {
        let html = render_inventory(
            &[
                entry("📄 2026-10-18", "archive/2026-10-18.html"),
                entry("📄 2026-10-17", "archive/2026-10-17.html"),
            ],
            EMPTY_DAILY_LABEL,
        );
        assert_eq!(
            html,
            "\n                <li><a href=\"archive/2026-10-18.html\">📄 2026-10-18</a></li>\
             \n                <li><a href=\"archive/2026-10-17.html\">📄 2026-10-17</a></li>\
             \n                "
        );
    }

    #[test]
    fn labels_are_escaped() {
        let html = render_inventory(&[entry("🎙️ Q&A (2026-10-18)", "archive/x.html")], "");
        assert!(html.contains("🎙️ Q&amp;A (2026-10-18)"));
    }

    #[test]
    fn snapshot_title_prefers_podcast_title() {
        let page = r#"<h3>Deep analysis card</h3>
            <div class="title-cn">🎙️ <span class="podcast-title">與晶片高層的對談</span></div>"#;
        assert_eq!(snapshot_title(page), "與晶片高層的對談");
    }

    #[test]
    fn snapshot_title_falls_back_to_h3_then_default() {
        assert_eq!(snapshot_title("<div><h3> Old  layout </h3></div>"), "Old layout");
        assert_eq!(snapshot_title("<p>no heading</p>"), DEFAULT_SNAPSHOT_TITLE);
    }
}
