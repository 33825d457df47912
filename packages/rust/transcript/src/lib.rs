//! Video transcript retrieval and caption cleanup.
//!
//! [`TranscriptFetcher::fetch_transcript`] turns a video ID or URL into
//! plain text by reading the watch page's caption tracks and downloading the
//! chosen timed-text document. [`clean_vtt`] handles caption files that were
//! downloaded some other way.

mod vtt;
mod youtube;

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument, warn};

use curation_shared::{CurationError, FetchConfig, Result, TranscriptConfig};

pub use vtt::clean_vtt;
pub use youtube::{CaptionTrack, caption_tracks, parse_timedtext, parse_video_id, pick_track};

// ---------------------------------------------------------------------------
// TranscriptResult
// ---------------------------------------------------------------------------

/// Outcome of one transcript fetch. Failures are reported here, not as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptResult {
    pub video_id: String,
    /// Fetched and long enough to use.
    pub success: bool,
    /// Met the minimum length.
    pub validation_passed: bool,
    pub text: String,
    pub char_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranscriptResult {
    fn failed(video_id: impl Into<String>, error: &CurationError) -> Self {
        Self {
            video_id: video_id.into(),
            success: false,
            validation_passed: false,
            text: String::new(),
            char_count: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Grade fetched text against the minimum length.
pub fn validate_transcript(video_id: &str, text: String, min_chars: usize) -> TranscriptResult {
    let char_count = text.chars().count();
    let validation_passed = char_count >= min_chars;
    TranscriptResult {
        video_id: video_id.to_string(),
        success: validation_passed,
        validation_passed,
        error: (!validation_passed)
            .then(|| format!("transcript too short: {char_count} chars (minimum {min_chars})")),
        text,
        char_count,
    }
}

// ---------------------------------------------------------------------------
// TranscriptFetcher
// ---------------------------------------------------------------------------

pub struct TranscriptFetcher {
    client: Client,
    config: TranscriptConfig,
}

impl TranscriptFetcher {
    pub fn new(fetch: &FetchConfig, config: &TranscriptConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(fetch.user_agent.as_str())
            .timeout(Duration::from_secs(fetch.timeout_secs))
            .build()
            .map_err(|e| CurationError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Fetch and validate the transcript for a video ID or URL.
    #[instrument(skip(self))]
    pub async fn fetch_transcript(&self, video: &str) -> TranscriptResult {
        let video_id = match parse_video_id(video) {
            Ok(id) => id,
            Err(e) => return TranscriptResult::failed(video.trim(), &e),
        };

        match self.download(&video_id).await {
            Ok(text) => {
                let result = validate_transcript(&video_id, text, self.config.min_chars);
                info!(
                    chars = result.char_count,
                    passed = result.validation_passed,
                    "transcript fetched"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "transcript fetch failed");
                TranscriptResult::failed(video_id, &e)
            }
        }
    }

    async fn download(&self, video_id: &str) -> Result<String> {
        let base = self.config.base_url.trim_end_matches('/');
        let watch_url = format!("{base}/watch?v={video_id}");
        let page = self.get_text(&watch_url).await?;

        let tracks = caption_tracks(&page)?;
        let track = pick_track(&tracks, &self.config.languages)
            .ok_or_else(|| CurationError::not_found(format!("caption track for {video_id}")))?;

        let xml = self.get_text(&track.base_url).await?;
        parse_timedtext(&xml)
    }

    async fn get_text(&self, url: &str) -> Result<String> {
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
}
