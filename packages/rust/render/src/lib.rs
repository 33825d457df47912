//! HTML fragment rendering for the published page.
//!
//! Every renderer here is a pure function of its inputs: dates are passed in,
//! never read from a clock. Text fields are escaped; summaries and chapter
//! bodies are trusted markup and go in as-is.

mod fields;
mod inventory;
mod news;
mod podcast;

use curation_shared::ContentRecord;

pub use fields::FieldMap;
pub use inventory::{
    DEFAULT_SNAPSHOT_TITLE, EMPTY_DAILY_LABEL, EMPTY_PODCAST_LABEL, render_inventory,
    snapshot_title,
};
pub use news::{AnalysisCard, render_news_region};
pub use podcast::{PodcastCard, highlighted_title, render_podcast_region};

/// Turns one record into a self-contained card fragment.
pub trait FragmentRenderer {
    fn render(&self, record: &ContentRecord) -> String;
}

/// Escape text for element content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
