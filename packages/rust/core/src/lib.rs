//! Core pipeline orchestration and domain logic for the curation site.
//!
//! This crate ties together feed polling, summarization, rendering, region
//! replacement, archiving, and publishing into end-to-end workflows (e.g.,
//! [`pipeline::run_daily`]).

pub mod archive;
pub mod pipeline;
pub mod publish;
pub mod state;
pub mod summarize;
pub mod updates;

pub use archive::{Inventory, Snapshot, archive_snapshot, scan_inventory, update_inventories};
pub use pipeline::{
    AnalysisReport, HeadlineReport, PodcastReport, ProgressReporter, RunOptions, RunReport,
    Services, SilentProgress, Site,
};
pub use publish::{PublishOutcome, publish};
pub use state::AnalysisState;
pub use summarize::{Article, Summarizer};
pub use updates::{SourceUpdate, check_for_updates, poll_sources};
