//! Shared types, error model, and configuration for the curation pipeline.
//!
//! This crate is the foundation depended on by all other curation crates.
//! It provides:
//! - [`CurationError`]: the unified error type
//! - Domain types ([`ContentRecord`], [`Headline`], [`NewsDigest`], [`InventoryEntry`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, FeedsConfig, FetchConfig, HeadlineFeedConfig, LlmConfig,
    PathsConfig, PublishConfig, RenderConfig, SourceConfig, TranscriptConfig, api_key,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{CurationError, Result};
pub use types::{Chapter, ContentRecord, Headline, Insight, InventoryEntry, NewsDigest, RunId};
