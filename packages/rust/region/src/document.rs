//! The host document value and its load/save boundary.

use std::path::Path;

use tracing::{debug, info};

use curation_shared::{CurationError, Result};

use crate::{Region, RegionKind, has_region, mentions_region, region_content, update_region};

/// The published page, held entirely in memory for the length of a run.
///
/// Replacements return a new document; the file on disk only changes when
/// [`HostDocument::save`] writes the final value in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDocument {
    text: String,
}

impl HostDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Read the document from disk. A missing file is [`CurationError::NotFound`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CurationError::not_found(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| CurationError::io(path, e))?;
        debug!(path = %path.display(), bytes = text.len(), "loaded host document");
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Return a copy of this document with `region` holding exactly `fragment`.
    pub fn replace(&self, region: &Region, fragment: &str) -> Result<Self> {
        let text = update_region(&self.text, region, fragment)?;
        debug!(
            start = region.start(),
            fragment_len = fragment.len(),
            "region replaced"
        );
        Ok(Self { text })
    }

    /// [`HostDocument::replace`] for a built-in region kind.
    pub fn replace_kind(&self, kind: RegionKind, fragment: &str) -> Result<Self> {
        self.replace(&kind.region(), fragment)
    }

    pub fn region_content(&self, region: &Region) -> Result<&str> {
        region_content(&self.text, region)
    }

    pub fn has_region(&self, kind: RegionKind) -> bool {
        has_region(&self.text, &kind.region())
    }

    /// Check that every built-in region mentioned in the document is intact.
    ///
    /// A region counts as mentioned when either of its markers appears; it is
    /// intact when both appear exactly once and in order.
    pub fn validate_markers(&self) -> Result<()> {
        for kind in RegionKind::ALL {
            let region = kind.region();
            if mentions_region(&self.text, &region) {
                region_content(&self.text, &region)?;
            }
        }
        Ok(())
    }

    /// Write the document to `path`, replacing the previous file in one rename.
    ///
    /// The text is written to a temporary sibling first, so a crash leaves
    /// either the old file or the new one, never a partial write.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate_markers()?;
        write_atomic(path, self.text.as_bytes())?;
        info!(path = %path.display(), bytes = self.text.len(), "host document saved");
        Ok(())
    }
}

/// Write `bytes` to a temp file next to `path`, then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CurationError::validation(format!("not a file path: {}", path.display())))?;
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, bytes).map_err(|e| CurationError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp);
        CurationError::io(path, e)
    })
}
