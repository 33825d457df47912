//! Tolerant reading of record JSON.
//!
//! Data files have been written by several generations of tooling, each with
//! its own key names. A [`FieldMap`] lists the accepted keys for every logical
//! field in fallback order; the first key holding a non-empty value wins.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use curation_shared::{Chapter, ContentRecord, CurationError, Headline, Insight, NewsDigest, Result};

/// Accepted JSON keys per logical field, in fallback order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    pub title: Vec<&'static str>,
    pub title_en: Vec<&'static str>,
    pub summary: Vec<&'static str>,
    pub url: Vec<&'static str>,
    pub chapter_title: Vec<&'static str>,
    pub insight_topic: Vec<&'static str>,
    pub insight_text: Vec<&'static str>,
    pub headline_title_en: Vec<&'static str>,
    pub headline_summary_en: Vec<&'static str>,
    pub headline_source: Vec<&'static str>,
    pub techmeme: Vec<&'static str>,
    pub wsj: Vec<&'static str>,
    pub deep_analysis: Vec<&'static str>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            title: vec!["title", "title_zh"],
            title_en: vec!["title_en"],
            summary: vec!["summary", "content", "analysis_zh", "summary_zh"],
            url: vec!["url", "link", "source_url"],
            chapter_title: vec!["title", "chapter_title"],
            insight_topic: vec!["topic"],
            insight_text: vec!["content", "insight"],
            headline_title_en: vec!["title_en", "title"],
            headline_summary_en: vec!["summary_en", "description"],
            headline_source: vec!["source", "media_source"],
            techmeme: vec!["techmeme", "Techmeme"],
            wsj: vec!["wsj", "WSJ_Technology"],
            deep_analysis: vec!["deep_analysis", "Deep_Analysis"],
        }
    }
}

impl FieldMap {
    /// Read one summary record. Non-object values yield an empty record.
    pub fn record(&self, value: &Value) -> ContentRecord {
        let Some(obj) = value.as_object() else {
            return ContentRecord::default();
        };

        ContentRecord {
            title: first_str(obj, &self.title).unwrap_or_default(),
            title_en: first_str(obj, &self.title_en).unwrap_or_default(),
            summary: first_str(obj, &self.summary).unwrap_or_default(),
            url: first_str(obj, &self.url),
            chapters: self.chapters(obj.get("chapters")),
            insights: self.insights(obj.get("insights")),
            date: first_str(obj, &["date"]),
            host: first_str(obj, &["host"]),
            guest: first_str(obj, &["guest"]),
            source_type: first_str(obj, &["source_type"]),
        }
    }

    fn chapters(&self, value: Option<&Value>) -> Vec<Chapter> {
        let Some(items) = value.and_then(Value::as_array) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(Value::as_object)
            .map(|ch| Chapter {
                title: first_str(ch, &self.chapter_title).unwrap_or_default(),
                timestamp: first_str(ch, &["timestamp"]).unwrap_or_default(),
                content: first_str(ch, &["content"]).unwrap_or_default(),
                quote: first_str(ch, &["quote"]).unwrap_or_default(),
            })
            .collect()
    }

    fn insights(&self, value: Option<&Value>) -> Vec<Insight> {
        let Some(items) = value.and_then(Value::as_array) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(Insight {
                    topic: None,
                    content: s.trim().to_string(),
                }),
                Value::Object(obj) => first_str(obj, &self.insight_text).map(|content| Insight {
                    topic: first_str(obj, &self.insight_topic),
                    content,
                }),
                _ => None,
            })
            .collect()
    }

    /// Read one headline.
    pub fn headline(&self, value: &Value) -> Headline {
        let Some(obj) = value.as_object() else {
            return Headline::default();
        };
        Headline {
            title_en: first_str(obj, &self.headline_title_en).unwrap_or_default(),
            title_zh: first_str(obj, &["title_zh"]).unwrap_or_default(),
            url: first_str(obj, &self.url).unwrap_or_else(|| "#".to_string()),
            summary_en: first_str(obj, &self.headline_summary_en).unwrap_or_default(),
            summary_zh: first_str(obj, &["summary_zh"]).unwrap_or_default(),
            source: first_str(obj, &self.headline_source).unwrap_or_default(),
        }
    }

    /// Read the daily digest. The top level must be an object.
    pub fn digest(&self, value: &Value) -> Result<NewsDigest> {
        let obj = value
            .as_object()
            .ok_or_else(|| CurationError::parse("news digest must be a JSON object"))?;

        let headlines = |keys: &[&str]| -> Vec<Headline> {
            first_value(obj, keys)
                .and_then(Value::as_array)
                .map(|items| items.iter().map(|v| self.headline(v)).collect())
                .unwrap_or_default()
        };

        Ok(NewsDigest {
            techmeme: headlines(self.techmeme.as_slice()),
            wsj: headlines(self.wsj.as_slice()),
            deep_analysis: first_value(obj, &self.deep_analysis)
                .map(|v| self.analysis_map(v))
                .unwrap_or_default(),
        })
    }

    /// Deep analysis arrives as one record, a `source → record` map, or a list.
    ///
    /// A single record is keyed by its title; list entries are keyed by
    /// zero-padded position so map order follows list order.
    fn analysis_map(&self, value: &Value) -> BTreeMap<String, ContentRecord> {
        match value {
            Value::Object(obj) if self.title.iter().any(|k| obj.contains_key(*k)) => {
                let record = self.record(value);
                BTreeMap::from([(record.title.clone(), record)])
            }
            Value::Object(obj) => obj
                .iter()
                .filter(|(_, v)| v.is_object())
                .map(|(source, v)| (source.clone(), self.record(v)))
                .collect(),
            Value::Array(items) => items
                .iter()
                .filter(|v| v.is_object())
                .enumerate()
                .map(|(i, v)| (format!("{i:03}"), self.record(v)))
                .collect(),
            other => {
                debug!(kind = ?other, "ignoring unrecognised deep analysis value");
                BTreeMap::new()
            }
        }
    }

    /// Read podcast data: an array of episodes, or a single episode object.
    pub fn podcast_records(&self, value: &Value) -> Result<Vec<ContentRecord>> {
        match value {
            Value::Array(items) => Ok(items
                .iter()
                .filter(|v| v.is_object())
                .map(|v| self.record(v))
                .collect()),
            Value::Object(_) => Ok(vec![self.record(value)]),
            _ => Err(CurationError::parse(
                "podcast data must be an episode object or an array of them",
            )),
        }
    }
}

fn first_value<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

/// First key whose value is a non-empty string (numbers are stringified).
fn first_str(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
