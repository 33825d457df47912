//! Last-seen links per analysis source (`analysis_state.json`).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use curation_region::write_atomic;
use curation_shared::{CurationError, Result};

/// `source name → last processed link`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisState {
    links: BTreeMap<String, String>,
}

impl AnalysisState {
    /// Load state; a missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no state file yet");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| CurationError::io(path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| CurationError::parse(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CurationError::parse(format!("failed to serialize state: {e}")))?;
        write_atomic(path, json.as_bytes())
    }

    pub fn last_link(&self, source: &str) -> Option<&str> {
        self.links.get(source).map(String::as_str)
    }

    pub fn record(&mut self, source: impl Into<String>, link: impl Into<String>) {
        self.links.insert(source.into(), link.into());
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = AnalysisState::load(&dir.path().join("analysis_state.json")).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis_state.json");

        let mut state = AnalysisState::default();
        state.record("Stratechery", "https://stratechery.com/a/");
        state.save(&path).unwrap();

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains(r#""Stratechery": "https://stratechery.com/a/""#));

        let reloaded = AnalysisState::load(&path).unwrap();
        assert_eq!(reloaded, state);
        assert_eq!(reloaded.last_link("Stratechery"), Some("https://stratechery.com/a/"));
        assert_eq!(reloaded.last_link("Other"), None);
    }

    #[test]
    fn record_overwrites() {
        let mut state = AnalysisState::default();
        state.record("S", "one");
        state.record("S", "two");
        assert_eq!(state.last_link("S"), Some("two"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis_state.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            AnalysisState::load(&path).unwrap_err(),
            CurationError::Parse { .. }
        ));
    }
}
