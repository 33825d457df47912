//! WebVTT caption cleanup.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Inline cue markup: `<c>`, `</c>`, `<c.colorE5E5E5>`, `<00:00:00.539>`.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag regex"));

/// Entries remembered before the de-duplication window resets.
const DEDUP_WINDOW: usize = 50;

/// Reduce a WebVTT file to its spoken lines, in order.
///
/// Auto-generated captions repeat each line as the next cue scrolls in, so
/// lines already seen in the recent window are dropped.
pub fn clean_vtt(input: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for raw in input.lines() {
        let line = raw.trim();
        if line.is_empty() || is_header(line) || line.contains("-->") {
            continue;
        }

        let cleaned = TAG_RE.replace_all(line, "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() || seen.contains(cleaned) {
            continue;
        }

        lines.push(cleaned.to_string());
        if seen.len() > DEDUP_WINDOW {
            seen.clear();
        }
        seen.insert(cleaned.to_string());
    }
    lines
}

fn is_header(line: &str) -> bool {
    ["WEBVTT", "Kind:", "Language:"]
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_auto_generated_captions() {
        let vtt = std::fs::read_to_string("../../../fixtures/transcript/episode.vtt").unwrap();
        assert_eq!(
            clean_vtt(&vtt),
            vec!["welcome back to the show", "today we're talking chips"]
        );
    }

    #[test]
    fn header_only_is_empty() {
        assert!(clean_vtt("WEBVTT\nKind: captions\nLanguage: en\n\n").is_empty());
    }

    #[test]
    fn tag_only_line_is_dropped() {
        assert!(clean_vtt("<c></c>\n<00:00:01.000>").is_empty());
    }

    #[test]
    fn window_reset_allows_old_lines_again() {
        let mut input: Vec<String> = (0..52).map(|i| format!("line {i}")).collect();
        input.push("line 0".into());
        let cleaned = clean_vtt(&input.join("\n"));

        assert_eq!(cleaned.len(), 53);
        assert_eq!(cleaned.last().map(String::as_str), Some("line 0"));
    }

    #[test]
    fn repeats_within_window_are_dropped() {
        let cleaned = clean_vtt("a\nb\na\nc\nb");
        assert_eq!(cleaned, vec!["a", "b", "c"]);
    }
}
