//! New-article detection for analysis sources.

use tracing::{debug, info, instrument};

use curation_fetch::{FeedLookup, Fetcher, normalize_link};
use curation_shared::SourceConfig;

use crate::state::AnalysisState;

/// A source whose newest link has not been processed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUpdate {
    pub name: String,
    pub link: String,
    pub title: String,
    pub prompt_type: String,
}

/// Look up the newest entry of every source, in order.
#[instrument(skip_all, fields(sources = sources.len()))]
pub async fn poll_sources(fetcher: &Fetcher, sources: &[SourceConfig]) -> Vec<FeedLookup> {
    let mut lookups = Vec::with_capacity(sources.len());
    for source in sources {
        debug!(source = %source.name, feed = %source.rss, "polling source");
        lookups.push(fetcher.fetch_latest(&source.rss).await);
    }
    lookups
}

/// Pair each source with its lookup and keep those with a new link.
///
/// Links are compared after trimming trailing slashes. Failed lookups are
/// skipped so a flaky feed never looks like an update.
pub fn check_for_updates(
    sources: &[SourceConfig],
    state: &AnalysisState,
    lookups: &[FeedLookup],
) -> Vec<SourceUpdate> {
    let updates: Vec<SourceUpdate> = sources
        .iter()
        .zip(lookups)
        .filter_map(|(source, lookup)| {
            let FeedLookup::Found { link, title } = lookup else {
                debug!(source = %source.name, "lookup failed, skipping");
                return None;
            };
            let unchanged = state
                .last_link(&source.name)
                .is_some_and(|last| normalize_link(last) == normalize_link(link));
            if unchanged {
                return None;
            }
            Some(SourceUpdate {
                name: source.name.clone(),
                link: link.clone(),
                title: title.clone(),
                prompt_type: source.prompt_type.clone(),
            })
        })
        .collect();

    info!(updates = updates.len(), "update check complete");
    updates
}
