//! Application configuration for the curation pipeline.
//!
//! Config lives at `<site>/curation.toml`, falling back to
//! `~/.daily-curation/curation.toml`. CLI flags override config file values,
//! which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CurationError, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "curation.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".daily-curation";

// ---------------------------------------------------------------------------
// Config structs (matching curation.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Site-relative file locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// HTTP fetch settings shared by all fetchers.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Headline feeds rendered into the news region.
    #[serde(default)]
    pub feeds: FeedsConfig,

    /// Deep-analysis sources polled for new articles.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,

    /// LLM summarizer settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Transcript fetcher settings.
    #[serde(default)]
    pub transcript: TranscriptConfig,

    /// Rendering settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Git publishing settings.
    #[serde(default)]
    pub publish: PublishConfig,
}

/// `[paths]` section. All paths are relative to the site directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// The host document.
    #[serde(default = "default_index_html")]
    pub index_html: String,

    /// Daily news digest JSON.
    #[serde(default = "default_news_data")]
    pub news_data: String,

    /// Podcast episode JSON.
    #[serde(default = "default_podcast_data")]
    pub podcast_data: String,

    /// Last-seen-link state file.
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Directory of archived snapshots.
    #[serde(default = "default_archive_dir")]
    pub archive_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            index_html: default_index_html(),
            news_data: default_news_data(),
            podcast_data: default_podcast_data(),
            state_file: default_state_file(),
            archive_dir: default_archive_dir(),
        }
    }
}

fn default_index_html() -> String {
    "index.html".into()
}
fn default_news_data() -> String {
    "daily_news_temp.json".into()
}
fn default_podcast_data() -> String {
    "podcast_data.json".into()
}
fn default_state_file() -> String {
    "analysis_state.json".into()
}
fn default_archive_dir() -> String {
    "archive".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header. Some feeds reject non-browser agents.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum article characters kept before prompting.
    #[serde(default = "default_max_article_chars")]
    pub max_article_chars: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
            max_article_chars: default_max_article_chars(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    10
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .into()
}
fn default_max_article_chars() -> usize {
    50_000
}

/// `[feeds]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Techmeme headline feed.
    #[serde(default = "default_techmeme")]
    pub techmeme: HeadlineFeedConfig,

    /// WSJ technology headline feed.
    #[serde(default = "default_wsj")]
    pub wsj: HeadlineFeedConfig,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            techmeme: default_techmeme(),
            wsj: default_wsj(),
        }
    }
}

/// A single headline feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlineFeedConfig {
    /// RSS URL.
    pub url: String,
    /// Maximum items kept.
    #[serde(default = "default_feed_limit")]
    pub limit: usize,
}

fn default_techmeme() -> HeadlineFeedConfig {
    HeadlineFeedConfig {
        url: "https://www.techmeme.com/feed.xml".into(),
        limit: 15,
    }
}
fn default_wsj() -> HeadlineFeedConfig {
    HeadlineFeedConfig {
        url: "https://feeds.a.dj.com/rss/RSSWSJTechnology.xml".into(),
        limit: 10,
    }
}
fn default_feed_limit() -> usize {
    10
}

/// `[[sources]]` entry - a deep-analysis source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Display name, also the key in the state file and digest.
    pub name: String,
    /// RSS or Atom feed URL.
    pub rss: String,
    /// Prompt flavour passed through to the summarizer.
    #[serde(default = "default_prompt_type")]
    pub prompt_type: String,
}

fn default_sources() -> Vec<SourceConfig> {
    vec![SourceConfig {
        name: "Stratechery".into(),
        rss: "https://stratechery.com/feed/".into(),
        prompt_type: default_prompt_type(),
    }]
}
fn default_prompt_type() -> String {
    "analysis".into()
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for summaries and translations.
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL (overridable for testing).
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Article characters included in a summarize prompt.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_llm_base_url(),
            timeout_secs: default_llm_timeout(),
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_model() -> String {
    "gemini-1.5-flash".into()
}
fn default_llm_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_llm_timeout() -> u64 {
    60
}
fn default_max_prompt_chars() -> usize {
    10_000
}

/// `[transcript]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// Video platform base URL (overridable for testing).
    #[serde(default = "default_video_base_url")]
    pub base_url: String,

    /// Preferred caption languages, in order.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Transcripts shorter than this are treated as failures.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            base_url: default_video_base_url(),
            languages: default_languages(),
            min_chars: default_min_chars(),
        }
    }
}

fn default_video_base_url() -> String {
    "https://www.youtube.com".into()
}
fn default_languages() -> Vec<String> {
    vec!["en".into()]
}
fn default_min_chars() -> usize {
    50
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Number of podcast episodes shown in the highlights region.
    #[serde(default = "default_podcast_highlights")]
    pub podcast_highlights: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            podcast_highlights: default_podcast_highlights(),
        }
    }
}

fn default_podcast_highlights() -> usize {
    3
}

/// `[publish]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Whether `run` pushes at the end.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Files staged for each commit.
    #[serde(default = "default_publish_files")]
    pub files: Vec<String>,

    /// Prefix of the generated commit message.
    #[serde(default = "default_commit_prefix")]
    pub commit_prefix: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            files: default_publish_files(),
            commit_prefix: default_commit_prefix(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_publish_files() -> Vec<String> {
    vec![
        "index.html".into(),
        "podcast_data.json".into(),
        "daily_news_temp.json".into(),
        "archive".into(),
    ]
}
fn default_commit_prefix() -> String {
    "Auto-update".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the global config directory (`~/.daily-curation/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| CurationError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the global config file (`~/.daily-curation/curation.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Resolve and load the config for a site.
///
/// Lookup order: `explicit` path, `<site_dir>/curation.toml`, the global
/// config file, then built-in defaults.
pub fn load_config(site_dir: &Path, explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(CurationError::not_found(path.display().to_string()));
        }
        return load_config_from(path);
    }

    let site_config = site_dir.join(CONFIG_FILE_NAME);
    if site_config.exists() {
        return load_config_from(&site_config);
    }

    if let Ok(global) = config_file_path() {
        if global.exists() {
            return load_config_from(&global);
        }
    }

    tracing::debug!(site = %site_dir.display(), "no config file found, using defaults");
    Ok(AppConfig::default())
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CurationError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| CurationError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default config file into the site directory.
/// Returns the path to the created file. An existing file is never overwritten.
pub fn init_config(site_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(site_dir).map_err(|e| CurationError::io(site_dir, e))?;

    let path = site_dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(CurationError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| CurationError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CurationError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the LLM API key from the environment, if set and non-empty.
///
/// Absence disables LLM-dependent features; it is not an error.
pub fn api_key(config: &AppConfig) -> Option<String> {
    std::env::var(&config.llm.api_key_env)
        .ok()
        .filter(|val| !val.trim().is_empty())
}

/// Require the LLM API key, for commands that cannot run without it.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.llm.api_key_env;
    api_key(config).ok_or_else(|| {
        CurationError::config(format!(
            "LLM API key not found. Set the {var_name} environment variable."
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("index_html"));
        assert!(toml_str.contains("GEMINI_API_KEY"));
        assert!(toml_str.contains("techmeme.com"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.feeds.techmeme.limit, 15);
        assert_eq!(parsed.feeds.wsj.limit, 10);
        assert_eq!(parsed.transcript.min_chars, 50);
        assert_eq!(parsed.llm.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let toml_str = r#"
[paths]
index_html = "public/index.html"

[[sources]]
name = "Ben's Bites"
rss = "https://bensbites.substack.com/feed"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.paths.index_html, "public/index.html");
        assert_eq!(config.paths.archive_dir, "archive");
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].prompt_type, "analysis");
        assert_eq!(config.render.podcast_highlights, 3);
        assert!(config.publish.enabled);
    }

    #[test]
    fn site_config_is_preferred() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[render]\npodcast_highlights = 5\n",
        )
        .expect("write config");

        let config = load_config(dir.path(), None).expect("load");
        assert_eq!(config.render.podcast_highlights, 5);
    }

    #[test]
    fn explicit_missing_config_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        let err = load_config(dir.path(), Some(&missing)).unwrap_err();
        assert!(matches!(err, CurationError::NotFound { .. }));
    }

    #[test]
    fn init_config_refuses_to_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = init_config(dir.path()).expect("init");
        assert!(path.exists());
        assert!(init_config(dir.path()).is_err());
    }

    #[test]
    fn api_key_absent_disables_llm() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.llm.api_key_env = "CURATION_TEST_NONEXISTENT_KEY_12345".into();
        assert!(api_key(&config).is_none());
        let err = validate_api_key(&config).unwrap_err();
        assert!(err.to_string().contains("API key not found"));
    }
}
