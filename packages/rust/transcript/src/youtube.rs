//! Watch-page caption discovery and timed-text parsing.

use std::sync::LazyLock;

use regex::Regex;
use roxmltree::Document;
use serde::Deserialize;
use url::Url;

use curation_shared::{CurationError, Result};

/// Video IDs are eleven URL-safe base64 characters.
static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("video id regex"));

/// One entry of the player response's `captionTracks` array.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `"asr"` for auto-generated tracks.
    #[serde(default)]
    pub kind: Option<String>,
}

/// Accept a bare video ID or any common YouTube URL form.
pub fn parse_video_id(input: &str) -> Result<String> {
    let input = input.trim();
    if VIDEO_ID_RE.is_match(input) {
        return Ok(input.to_string());
    }

    let url = Url::parse(input)
        .map_err(|_| CurationError::validation(format!("not a video ID or URL: {input}")))?;
    let host = url.host_str().unwrap_or_default().trim_start_matches("www.");

    let candidate = match host {
        "youtu.be" => url.path_segments().and_then(|mut s| s.next()).map(str::to_string),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" => {
            let mut segments = url.path_segments().into_iter().flatten();
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("shorts" | "embed" | "live" | "v") => segments.next().map(str::to_string),
                _ => None,
            }
        }
        _ => None,
    };

    candidate
        .filter(|id| VIDEO_ID_RE.is_match(id))
        .ok_or_else(|| CurationError::validation(format!("no video ID in URL: {input}")))
}

/// Pull the `captionTracks` array out of a watch page.
///
/// The array sits inside inline player JSON; it is read with a streaming
/// deserializer so nested arrays inside track names do not cut it short.
pub fn caption_tracks(watch_html: &str) -> Result<Vec<CaptionTrack>> {
    const KEY: &str = "\"captionTracks\":";
    let start = watch_html
        .find(KEY)
        .ok_or_else(|| CurationError::not_found("captions for this video"))?;

    let rest = &watch_html[start + KEY.len()..];
    serde_json::Deserializer::from_str(rest)
        .into_iter::<Vec<CaptionTrack>>()
        .next()
        .ok_or_else(|| CurationError::parse("empty captionTracks value"))?
        .map_err(|e| CurationError::parse(format!("captionTracks: {e}")))
}

/// Choose a track: first configured language with a manual track, then any
/// track in that language, then whatever comes first.
pub fn pick_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    for lang in languages {
        let in_lang = tracks.iter().filter(|t| &t.language_code == lang);
        let manual = in_lang.clone().find(|t| t.kind.as_deref() != Some("asr"));
        if let Some(track) = manual.or_else(|| in_lang.clone().next()) {
            return Some(track);
        }
    }
    tracks.first()
}

/// Join the segments of a timed-text document with spaces.
///
/// Handles both the classic `<transcript><text>` layout and the newer
/// `<timedtext><body><p>` one.
pub fn parse_timedtext(xml: &str) -> Result<String> {
    let doc = Document::parse(xml.trim_start())
        .map_err(|e| CurationError::parse(format!("invalid timed-text XML: {e}")))?;

    let segments: Vec<String> = doc
        .descendants()
        .filter(|n| n.is_element() && matches!(n.tag_name().name(), "text" | "p"))
        .map(|n| {
            let raw: String = n
                .descendants()
                .filter(|d| d.is_text())
                .filter_map(|d| d.text())
                .collect();
            decode_entities(&raw)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|s| !s.is_empty())
        .collect();

    Ok(segments.join(" "))
}

/// Timed-text bodies are entity-encoded twice; XML parsing removes one layer.
fn decode_entities(text: &str) -> String {
    text.replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_id_forms() {
        for input in [
            "rA6nX-C07ws",
            "https://www.youtube.com/watch?v=rA6nX-C07ws",
            "https://www.youtube.com/watch?feature=share&v=rA6nX-C07ws",
            "https://youtu.be/rA6nX-C07ws?t=30",
            "https://m.youtube.com/shorts/rA6nX-C07ws",
            "https://www.youtube.com/embed/rA6nX-C07ws",
        ] {
            assert_eq!(parse_video_id(input).unwrap(), "rA6nX-C07ws", "{input}");
        }
    }

    #[test]
    fn test_parse_video_id_rejects_junk() {
        assert!(parse_video_id("short").is_err());
        assert!(parse_video_id("https://vimeo.com/12345678901").is_err());
        assert!(parse_video_id("https://www.youtube.com/channel/UCxyz").is_err());
    }

    #[test]
    fn test_caption_tracks_from_watch_page() {
        let html = std::fs::read_to_string("../../../fixtures/transcript/watch.html").unwrap();
        let tracks = caption_tracks(&html).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].language_code, "en");
        assert_eq!(tracks[1].kind.as_deref(), Some("asr"));
    }

    #[test]
    fn test_caption_tracks_missing() {
        let err = caption_tracks("<html>no captions</html>").unwrap_err();
        assert!(matches!(err, CurationError::NotFound { .. }));
    }

    #[test]
    fn test_pick_track_prefers_manual_in_language() {
        let track = |lang: &str, kind: Option<&str>| CaptionTrack {
            base_url: format!("https://x/{lang}"),
            language_code: lang.into(),
            kind: kind.map(str::to_string),
        };
        let tracks = vec![track("de", None), track("en", Some("asr")), track("en", None)];

        let en = pick_track(&tracks, &["en".into()]).unwrap();
        assert_eq!(en.kind, None);
        assert_eq!(en.language_code, "en");

        let fallback = pick_track(&tracks, &["ja".into()]).unwrap();
        assert_eq!(fallback.language_code, "de");

        assert!(pick_track(&[], &["en".into()]).is_none());
    }

    #[test]
    fn test_parse_timedtext_classic() {
        let xml = std::fs::read_to_string("../../../fixtures/transcript/timedtext.xml").unwrap();
        assert_eq!(
            parse_timedtext(&xml).unwrap(),
            "welcome back to the show today we're talking about chips & export rules \
             and what comes after the current cycle"
        );
    }

    #[test]
    fn test_parse_timedtext_format3() {
        let xml = r#"<timedtext format="3"><body><p t="0" d="1000">hello<s> there</s></p><p t="1000" d="500">
friend</p></body></timedtext>"#;
        assert_eq!(parse_timedtext(xml).unwrap(), "hello there friend");
    }
}
