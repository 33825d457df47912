//! Feed polling and page fetching.
//!
//! Everything network-facing that is not the LLM or a transcript lives here:
//! latest-link lookup for analysis sources, headline lists for the news
//! region, article text for prompting, and page titles.

mod feed;
mod page;

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use curation_shared::{CurationError, FetchConfig, Headline, Result};

use feed::FeedItem;
pub use page::{article_markdown, extract_title, strip_tags, truncate_chars};

/// Maximum redirects followed for any request.
const MAX_REDIRECTS: usize = 5;

/// Maximum characters of a feed description kept on a headline.
const SUMMARY_CHARS: usize = 200;

/// Title used when a link had to be recovered from unparseable XML.
pub const FALLBACK_TITLE: &str = "Title Unknown (String Parse)";

// ---------------------------------------------------------------------------
// FeedLookup
// ---------------------------------------------------------------------------

/// Outcome of asking a feed for its newest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLookup {
    Found { link: String, title: String },
    /// Timeout, HTTP error, empty feed, or no usable link.
    NotFound { reason: String },
}

impl FeedLookup {
    fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound {
            reason: reason.into(),
        }
    }

    pub fn link(&self) -> Option<&str> {
        match self {
            Self::Found { link, .. } => Some(link),
            Self::NotFound { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Shared HTTP client plus fetch limits.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_article_chars: usize,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = build_client(config)?;
        Ok(Self {
            client,
            max_article_chars: config.max_article_chars,
        })
    }

    /// GET `url` and return the body. Non-2xx statuses are [`CurationError::Network`].
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CurationError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CurationError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| CurationError::Network(format!("{url}: failed to read body: {e}")))
    }

    /// Newest entry of a feed. Never fails; problems become [`FeedLookup::NotFound`].
    ///
    /// Links must be absolute `http(s)` URLs. When the XML is malformed the
    /// first item's link is recovered from the raw text instead.
    #[instrument(skip(self))]
    pub async fn fetch_latest(&self, feed_url: &str) -> FeedLookup {
        let body = match self.get_text(feed_url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "feed fetch failed");
                return FeedLookup::not_found(e.to_string());
            }
        };

        let (link, title) = match feed::parse_feed(&body) {
            Ok(parsed) => {
                let Some(first) = parsed.items.into_iter().next() else {
                    return FeedLookup::not_found("feed has no entries");
                };
                let title = first.title.unwrap_or_else(|| "No Title".to_string());
                (first.link, title)
            }
            Err(e) => {
                debug!(error = %e, "strict parse failed, trying string fallback");
                (feed::fallback_link(&body), FALLBACK_TITLE.to_string())
            }
        };

        match link {
            Some(link) if is_http_link(&link) => {
                info!(%link, "latest entry found");
                FeedLookup::Found { link, title }
            }
            Some(link) => FeedLookup::not_found(format!("not an http link: {link}")),
            None => FeedLookup::not_found("no link in latest entry"),
        }
    }

    /// Up to `limit` headlines from a feed, in feed order.
    ///
    /// Any failure is logged and yields an empty list.
    #[instrument(skip(self))]
    pub async fn fetch_items(&self, feed_url: &str, limit: usize) -> Vec<Headline> {
        let parsed = match self.get_text(feed_url).await.and_then(|b| feed::parse_feed(&b)) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "headline feed unavailable");
                return Vec::new();
            }
        };

        let headlines: Vec<Headline> = parsed
            .items
            .into_iter()
            .take(limit)
            .map(headline_from_item)
            .collect();
        info!(count = headlines.len(), "headlines fetched");
        headlines
    }

    /// Article page converted to Markdown and capped for prompting.
    #[instrument(skip(self))]
    pub async fn fetch_article_text(&self, url: &str) -> Result<String> {
        let html = self.get_text(url).await?;
        article_markdown(&html, self.max_article_chars)
    }

    /// Display title of a page. A page with no title is [`CurationError::NotFound`].
    #[instrument(skip(self))]
    pub async fn fetch_page_title(&self, url: &str) -> Result<String> {
        let html = self.get_text(url).await?;
        extract_title(&html).ok_or_else(|| CurationError::not_found(format!("title of {url}")))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_client(config: &FetchConfig) -> Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| CurationError::Network(format!("failed to build HTTP client: {e}")))
}

fn is_http_link(link: &str) -> bool {
    url::Url::parse(link).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

fn headline_from_item(item: FeedItem) -> Headline {
    let summary_en = item
        .description
        .map(|d| strip_tags(&d))
        .filter(|d| !d.is_empty())
        .map(|d| format!("{}...", truncate_chars(&d, SUMMARY_CHARS)))
        .unwrap_or_default();

    Headline {
        title_en: item.title.unwrap_or_else(|| "No Title".to_string()),
        url: item.link.unwrap_or_else(|| "#".to_string()),
        summary_en,
        ..Default::default()
    }
}

/// Normalize a link for change detection: trim and drop trailing slashes.
pub fn normalize_link(link: &str) -> &str {
    link.trim().trim_end_matches('/')
}
