//! Core domain types shared by fetchers, renderers, and pipelines.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ContentRecord
// ---------------------------------------------------------------------------

/// Structured summary data produced by a transformer and consumed by a renderer.
///
/// Serialized with canonical key names. Reading tolerates legacy key names
/// through the renderer's field map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Display title (usually Traditional Chinese).
    pub title: String,
    /// Original-language title.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title_en: String,
    /// Summary body. Trusted markup (may contain `<p>` paragraphs).
    #[serde(default)]
    pub summary: String,
    /// Source link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Ordered chapter breakdown (podcasts).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chapters: Vec<Chapter>,
    /// Ordered key insights (analysis articles).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insights: Vec<Insight>,
    /// Publication or update date, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Podcast host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Podcast guest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest: Option<String>,
    /// Kind of material the summary was made from (transcript, article, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
}

/// One chapter of a long-form record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub quote: String,
}

/// One key insight. Plain-string insights have no topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub content: String,
}

// ---------------------------------------------------------------------------
// Headlines and the daily digest
// ---------------------------------------------------------------------------

/// One headline item from a news feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    /// Original-language title.
    pub title_en: String,
    /// Translated title, empty until translated.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title_zh: String,
    /// Story link.
    pub url: String,
    /// Truncated feed description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary_en: String,
    /// Translated summary.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary_zh: String,
    /// Publisher shown on the link button.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
}

/// The daily news digest persisted between runs (`daily_news_temp.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsDigest {
    #[serde(default)]
    pub techmeme: Vec<Headline>,
    #[serde(default)]
    pub wsj: Vec<Headline>,
    /// Latest analysis per source name.
    #[serde(default)]
    pub deep_analysis: BTreeMap<String, ContentRecord>,
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// One archived snapshot link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// Link text shown in the list.
    pub label: String,
    /// Link target relative to the host document.
    pub href: String,
}
