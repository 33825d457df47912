//! Marker-delimited region replacement for the published page.
//!
//! A region is the text strictly between a start sentinel and an end sentinel
//! that both appear literally, exactly once, in the host document. Replacing a
//! region is a pure string function: everything outside the markers is kept
//! byte-for-byte and the content between them becomes exactly the new fragment.
//!
//! Persistence lives in [`HostDocument`]; nothing in this module touches disk.

mod document;

use std::borrow::Cow;

use curation_shared::{CurationError, Result};

pub use document::{HostDocument, write_atomic};

// ---------------------------------------------------------------------------
// Built-in markers (bit-exact, the page template depends on them)
// ---------------------------------------------------------------------------

pub const DAILY_NEWS_START: &str = "<!-- DAILY_NEWS_START -->";
pub const DAILY_NEWS_END: &str = "<!-- DAILY_NEWS_END -->";
pub const PODCAST_HIGHLIGHTS_START: &str = "<!-- PODCAST_HIGHLIGHTS_START -->";
pub const PODCAST_HIGHLIGHTS_END: &str = "<!-- PODCAST_HIGHLIGHTS_END -->";
pub const DAILY_INVENTORY_START: &str = "<!-- DAILY_INVENTORY_START -->";
pub const DAILY_INVENTORY_END: &str = "<!-- DAILY_INVENTORY_END -->";
pub const PODCAST_INVENTORY_START: &str = "<!-- PODCAST_INVENTORY_START -->";
pub const PODCAST_INVENTORY_END: &str = "<!-- PODCAST_INVENTORY_END -->";

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

/// A pair of literal sentinel markers delimiting one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    start: Cow<'static, str>,
    end: Cow<'static, str>,
}

impl Region {
    /// A region with caller-supplied markers.
    ///
    /// Markers are matched as plain text; regex metacharacters have no meaning.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: Cow::Owned(start.into()),
            end: Cow::Owned(end.into()),
        }
    }

    const fn from_static(start: &'static str, end: &'static str) -> Self {
        Self {
            start: Cow::Borrowed(start),
            end: Cow::Borrowed(end),
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }
}

/// The regions owned by the automated updaters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    DailyNews,
    PodcastHighlights,
    DailyInventory,
    PodcastInventory,
}

impl RegionKind {
    /// Every built-in region kind.
    pub const ALL: [RegionKind; 4] = [
        Self::DailyNews,
        Self::PodcastHighlights,
        Self::DailyInventory,
        Self::PodcastInventory,
    ];

    /// Upper-case name embedded in the markers.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DailyNews => "DAILY_NEWS",
            Self::PodcastHighlights => "PODCAST_HIGHLIGHTS",
            Self::DailyInventory => "DAILY_INVENTORY",
            Self::PodcastInventory => "PODCAST_INVENTORY",
        }
    }

    /// The marker pair for this kind.
    pub fn region(&self) -> Region {
        match self {
            Self::DailyNews => Region::from_static(DAILY_NEWS_START, DAILY_NEWS_END),
            Self::PodcastHighlights => {
                Region::from_static(PODCAST_HIGHLIGHTS_START, PODCAST_HIGHLIGHTS_END)
            }
            Self::DailyInventory => {
                Region::from_static(DAILY_INVENTORY_START, DAILY_INVENTORY_END)
            }
            Self::PodcastInventory => {
                Region::from_static(PODCAST_INVENTORY_START, PODCAST_INVENTORY_END)
            }
        }
    }
}

impl std::fmt::Display for RegionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Replacement
// ---------------------------------------------------------------------------

/// Byte offsets of a region's content (exclusive of both markers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    content_start: usize,
    content_end: usize,
}

/// Replace the content of `region` in `doc` with `fragment`.
///
/// Fails with [`CurationError::RegionNotFound`] if either marker is missing
/// (or no end marker follows the start marker), and with a validation error
/// if a marker appears more than once or the fragment itself contains one of
/// the markers, or if the fragment would run into the surrounding text to form
/// a marker. On error `doc` is untouched.
///
/// The region is the shortest span from the start marker to the nearest
/// following end marker. The fragment is installed verbatim, so calling this
/// again with the same fragment returns the same document.
pub fn update_region(doc: &str, region: &Region, fragment: &str) -> Result<String> {
    let span = locate(doc, region)?;
    if fragment.contains(region.start()) || fragment.contains(region.end()) {
        return Err(CurationError::validation(
            "fragment contains its own region marker",
        ));
    }

    let mut out = String::with_capacity(
        doc.len() - (span.content_end - span.content_start) + fragment.len(),
    );
    out.push_str(&doc[..span.content_start]);
    out.push_str(fragment);
    out.push_str(&doc[span.content_end..]);

    // A fragment can still combine with the text around it into a marker.
    match locate(&out, region) {
        Ok(installed) if &out[installed.content_start..installed.content_end] == fragment => Ok(out),
        _ => Err(CurationError::validation(
            "fragment joins the surrounding text into a region marker",
        )),
    }
}

/// Borrow the current content of `region`.
pub fn region_content<'a>(doc: &'a str, region: &Region) -> Result<&'a str> {
    let span = locate(doc, region)?;
    Ok(&doc[span.content_start..span.content_end])
}

/// Whether `doc` holds a well-formed instance of `region`.
pub fn has_region(doc: &str, region: &Region) -> bool {
    locate(doc, region).is_ok()
}

/// Whether either marker of `region` appears at all.
pub(crate) fn mentions_region(doc: &str, region: &Region) -> bool {
    doc.contains(region.start()) || doc.contains(region.end())
}

fn locate(doc: &str, region: &Region) -> Result<Span> {
    ensure_single(doc, region.start())?;
    ensure_single(doc, region.end())?;

    let start_at = doc
        .find(region.start())
        .ok_or_else(|| CurationError::region_not_found(region.start()))?;
    let content_start = start_at + region.start().len();

    let end_offset = doc[content_start..]
        .find(region.end())
        .ok_or_else(|| CurationError::region_not_found(region.end()))?;

    Ok(Span {
        content_start,
        content_end: content_start + end_offset,
    })
}

fn ensure_single(doc: &str, marker: &str) -> Result<()> {
    if marker.is_empty() {
        return Err(CurationError::validation("region marker must not be empty"));
    }
    match doc.matches(marker).count() {
        0 => Err(CurationError::region_not_found(marker)),
        1 => Ok(()),
        n => Err(CurationError::validation(format!(
            "region marker {marker} appears {n} times, expected exactly once"
        ))),
    }
}
