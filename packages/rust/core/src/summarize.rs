//! LLM summarization over the Gemini `generateContent` API.
//!
//! One request per article or headline batch, awaited in sequence. The model
//! is asked for JSON; replies are tolerated with or without Markdown fences.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use curation_fetch::truncate_chars;
use curation_render::FieldMap;
use curation_shared::{
    AppConfig, ContentRecord, CurationError, LlmConfig, Result, validate_api_key,
};

const ANALYSIS_INSTRUCTION: &str = r#"You are a professional tech analyst (Daily News Curation Agent).
Task: Summarize the following article in Traditional Chinese (繁體中文).

Output Format (JSON):
{
    "title": "Translated Title in Chinese",
    "title_en": "Original English Title",
    "analysis_zh": "A fluent, journalistic summary (300-500 words). Do not use bullet points here. Use <p> tags for paragraphs. Use 🌵 emoji occasionally.",
    "insights": ["Key Insight 1", "Key Insight 2", "Key Insight 3"]
}

Article:"#;

const TRANSLATE_INSTRUCTION: &str = "Translate these titles to Traditional Chinese (Taiwan). \
Return a JSON object where keys are indices and values are translated titles.";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

// ---------------------------------------------------------------------------
// Summarizer
// ---------------------------------------------------------------------------

/// An article ready to be summarized.
#[derive(Debug, Clone)]
pub struct Article {
    pub title: String,
    pub link: String,
    /// Article body as Markdown.
    pub text: String,
}

pub struct Summarizer {
    client: Client,
    api_key: String,
    endpoint: String,
    max_prompt_chars: usize,
    fields: FieldMap,
}

impl Summarizer {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CurationError::Summarize(format!("failed to build HTTP client: {e}")))?;

        let base = config.base_url.trim_end_matches('/');
        Ok(Self {
            client,
            api_key,
            endpoint: format!("{base}/models/{}:generateContent", config.model),
            max_prompt_chars: config.max_prompt_chars,
            fields: FieldMap::default(),
        })
    }

    /// Build a summarizer when the API key is set; `None` (with a warning) when not.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>> {
        match validate_api_key(config) {
            Ok(key) => Self::new(&config.llm, key).map(Some),
            Err(e) => {
                warn!(error = %e, "summaries and translations are disabled");
                Ok(None)
            }
        }
    }

    /// Send one prompt and return the first candidate's text.
    #[instrument(skip_all, fields(prompt_chars = prompt.chars().count()))]
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CurationError::Summarize(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CurationError::Summarize(format!(
                "HTTP {status}: {}",
                truncate_chars(detail.trim(), 300)
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CurationError::Summarize(format!("unreadable response: {e}")))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| CurationError::Summarize("response has no candidates".into()))?;

        debug!(chars = text.chars().count(), "LLM reply received");
        Ok(text)
    }

    /// Summarize an article into a record; the article link becomes its url.
    #[instrument(skip_all, fields(link = %article.link))]
    pub async fn summarize(&self, article: &Article) -> Result<ContentRecord> {
        let snippet = truncate_chars(&article.text, self.max_prompt_chars);
        let prompt = format!(
            "{ANALYSIS_INSTRUCTION}\nTitle: {}\nLink: {}\nContent Snippet: {snippet}...",
            article.title, article.link
        );

        let reply = self.generate(&prompt).await?;
        let value = parse_json_reply(&reply)?;
        if !value.is_object() {
            return Err(CurationError::Summarize("summary reply is not a JSON object".into()));
        }

        let mut record = self.fields.record(&value);
        if record.title.is_empty() {
            record.title = article.title.clone();
        }
        record.url = Some(article.link.clone());
        record.source_type = Some("article".into());

        info!(title = %record.title, insights = record.insights.len(), "article summarized");
        Ok(record)
    }

    /// Translate titles in one batch. Keys are positions in `titles`.
    ///
    /// Entries the model skipped or numbered out of range are left out.
    #[instrument(skip_all, fields(count = titles.len()))]
    pub async fn translate_titles(&self, titles: &[String]) -> Result<HashMap<usize, String>> {
        if titles.is_empty() {
            return Ok(HashMap::new());
        }

        let mut prompt = format!("{TRANSLATE_INSTRUCTION}\n");
        for (i, title) in titles.iter().enumerate() {
            prompt.push_str(&format!("{i}: {title}\n"));
        }

        let reply = self.generate(&prompt).await?;
        let value = parse_json_reply(&reply)?;
        let obj = value
            .as_object()
            .ok_or_else(|| CurationError::Summarize("translation reply is not a JSON object".into()))?;

        let translations: HashMap<usize, String> = obj
            .iter()
            .filter_map(|(k, v)| {
                let index = k.trim().parse::<usize>().ok().filter(|i| *i < titles.len())?;
                let text = v.as_str()?.trim();
                (!text.is_empty()).then(|| (index, text.to_string()))
            })
            .collect();

        info!(translated = translations.len(), "titles translated");
        Ok(translations)
    }
}

/// Parse a model reply as JSON, dropping Markdown code fences.
fn parse_json_reply(reply: &str) -> Result<serde_json::Value> {
    let cleaned = reply.replace("```json", "").replace("```", "");
    serde_json::from_str(cleaned.trim())
        .map_err(|e| CurationError::Summarize(format!("reply is not valid JSON: {e}")))
}
