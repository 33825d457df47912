//! Immutable page snapshots and the inventories that list them.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use curation_region::{HostDocument, RegionKind, write_atomic};
use curation_render::{EMPTY_DAILY_LABEL, EMPTY_PODCAST_LABEL, render_inventory, snapshot_title};
use curation_shared::{CurationError, InventoryEntry, Result};

/// `YYYY-MM-DD.html`: a daily snapshot.
static DAILY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})\.html$").expect("daily regex"));

/// `YYYY-MM-DD-<anything>.html`: a podcast snapshot.
static PODCAST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})-.*\.html$").expect("podcast regex"));

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub path: PathBuf,
    /// False when a snapshot with this label already existed and was kept.
    pub created: bool,
}

/// Write `doc` to `<archive_dir>/<label>.html` unless that snapshot exists.
///
/// Existing snapshots are never overwritten. One whose content differs from
/// `doc` is reported at warn level.
#[instrument(skip(doc, archive_dir))]
pub fn archive_snapshot(doc: &HostDocument, archive_dir: &Path, label: &str) -> Result<Snapshot> {
    validate_label(label)?;
    let path = archive_dir.join(format!("{label}.html"));

    if path.exists() {
        let existing = std::fs::read_to_string(&path).map_err(|e| CurationError::io(&path, e))?;
        if compute_hash(&existing) == compute_hash(doc.as_str()) {
            debug!(path = %path.display(), "identical snapshot already archived");
        } else {
            warn!(path = %path.display(), "snapshot exists with different content; keeping it");
        }
        return Ok(Snapshot { path, created: false });
    }

    std::fs::create_dir_all(archive_dir).map_err(|e| CurationError::io(archive_dir, e))?;
    write_atomic(&path, doc.as_str().as_bytes())?;
    info!(path = %path.display(), "snapshot archived");
    Ok(Snapshot { path, created: true })
}

fn validate_label(label: &str) -> Result<()> {
    let ok = !label.is_empty()
        && !label.starts_with('.')
        && label
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_'));
    if ok {
        Ok(())
    } else {
        Err(CurationError::validation(format!(
            "invalid snapshot label: {label:?}"
        )))
    }
}

fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Archived snapshots split by kind, newest first. Hrefs are bare file names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub daily: Vec<InventoryEntry>,
    pub podcast: Vec<InventoryEntry>,
}

/// Classify every `.html` file in the archive directory.
#[instrument]
pub fn scan_inventory(archive_dir: &Path) -> Result<Inventory> {
    if !archive_dir.is_dir() {
        return Err(CurationError::not_found(archive_dir.display().to_string()));
    }

    let mut names: Vec<String> = std::fs::read_dir(archive_dir)
        .map_err(|e| CurationError::io(archive_dir, e))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(".html"))
        .collect();
    names.sort_unstable_by(|a, b| b.cmp(a));

    let mut inventory = Inventory::default();
    for name in names {
        if let Some(caps) = DAILY_RE.captures(&name) {
            let label = format!("📄 {}", &caps[1]);
            inventory.daily.push(InventoryEntry { label, href: name });
        } else if let Some(caps) = PODCAST_RE.captures(&name) {
            let date = caps[1].to_string();
            let path = archive_dir.join(&name);
            let html = std::fs::read_to_string(&path).map_err(|e| CurationError::io(&path, e))?;
            let label = format!("🎙️ {} ({date})", snapshot_title(&html));
            inventory.podcast.push(InventoryEntry { label, href: name });
        } else {
            debug!(%name, "ignoring unrecognised archive file");
        }
    }

    info!(
        daily = inventory.daily.len(),
        podcast = inventory.podcast.len(),
        "archive scanned"
    );
    Ok(inventory)
}

/// Install both inventory lists. Hrefs are joined onto `href_prefix`.
///
/// Both inventory regions must exist; a missing one fails the whole update.
pub fn update_inventories(
    doc: &HostDocument,
    inventory: &Inventory,
    href_prefix: &str,
) -> Result<HostDocument> {
    let prefixed = |entries: &[InventoryEntry]| -> Vec<InventoryEntry> {
        entries
            .iter()
            .map(|e| InventoryEntry {
                label: e.label.clone(),
                href: join_href(href_prefix, &e.href),
            })
            .collect()
    };

    let daily = render_inventory(&prefixed(inventory.daily.as_slice()), EMPTY_DAILY_LABEL);
    let podcast = render_inventory(&prefixed(inventory.podcast.as_slice()), EMPTY_PODCAST_LABEL);

    doc.replace_kind(RegionKind::DailyInventory, &daily)?
        .replace_kind(RegionKind::PodcastInventory, &podcast)
}

fn join_href(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}
