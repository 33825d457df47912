//! End-to-end curation workflows.
//!
//! Each workflow reads the host document once, transforms it in memory, and
//! writes it once. Network failures for one feed or source are logged and
//! leave existing data in place; missing input files and missing region
//! markers abort before anything is written.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use curation_fetch::Fetcher;
use curation_region::{HostDocument, RegionKind, write_atomic};
use curation_render::{FieldMap, highlighted_title, render_news_region, render_podcast_region};
use curation_shared::{
    AppConfig, ContentRecord, CurationError, Headline, HeadlineFeedConfig, NewsDigest, Result,
    RunId,
};

use crate::archive::{Inventory, Snapshot, archive_snapshot, scan_inventory, update_inventories};
use crate::publish::{PublishOutcome, publish};
use crate::state::AnalysisState;
use crate::summarize::{Article, Summarizer};
use crate::updates::{SourceUpdate, check_for_updates, poll_sources};

// ---------------------------------------------------------------------------
// Site & services
// ---------------------------------------------------------------------------

/// A site directory and the config that describes its files.
#[derive(Debug, Clone)]
pub struct Site {
    pub root: PathBuf,
    pub config: AppConfig,
}

impl Site {
    pub fn new(root: impl Into<PathBuf>, config: AppConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(&self.config.paths.index_html)
    }

    pub fn news_path(&self) -> PathBuf {
        self.root.join(&self.config.paths.news_data)
    }

    pub fn podcast_path(&self) -> PathBuf {
        self.root.join(&self.config.paths.podcast_data)
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join(&self.config.paths.state_file)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.archive_dir)
    }

    /// Archive directory as seen from the host document, for inventory links.
    pub fn archive_href_prefix(&self) -> &str {
        &self.config.paths.archive_dir
    }
}

/// Network clients used by the workflows.
pub struct Services {
    pub fetcher: Fetcher,
    /// `None` when no API key is configured.
    pub summarizer: Option<Summarizer>,
}

impl Services {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(&config.fetch)?,
            summarizer: Summarizer::from_config(config)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for the CLI.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called for each item within a phase.
    fn step(&self, current: usize, total: usize, detail: &str);
    /// Called when a full run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn step(&self, _current: usize, _total: usize, _detail: &str) {}
    fn done(&self, _report: &RunReport) {}
}

// ---------------------------------------------------------------------------
// Data files
// ---------------------------------------------------------------------------

fn read_json(path: &Path) -> Result<serde_json::Value> {
    if !path.exists() {
        return Err(CurationError::not_found(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path).map_err(|e| CurationError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| CurationError::parse(format!("{}: {e}", path.display())))
}

/// Load the news digest, accepting legacy key names.
pub fn load_digest(path: &Path) -> Result<NewsDigest> {
    FieldMap::default().digest(&read_json(path)?)
}

fn load_digest_or_default(path: &Path) -> Result<NewsDigest> {
    if path.exists() {
        load_digest(path)
    } else {
        Ok(NewsDigest::default())
    }
}

pub fn save_digest(path: &Path, digest: &NewsDigest) -> Result<()> {
    let json = serde_json::to_string_pretty(digest)
        .map_err(|e| CurationError::parse(format!("failed to serialize digest: {e}")))?;
    write_atomic(path, json.as_bytes())
}

/// Load podcast episodes: an array, or a single episode object.
pub fn load_podcasts(path: &Path) -> Result<Vec<ContentRecord>> {
    FieldMap::default().podcast_records(&read_json(path)?)
}

// ---------------------------------------------------------------------------
// Headlines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlineReport {
    pub techmeme: usize,
    pub wsj: usize,
    pub translated: usize,
    /// Feeds that returned nothing and kept their previous items.
    pub kept_existing: Vec<String>,
}

/// Refresh both headline lists in the digest file.
#[instrument(skip_all)]
pub async fn refresh_headlines(
    site: &Site,
    services: &Services,
    progress: &dyn ProgressReporter,
) -> Result<HeadlineReport> {
    let path = site.news_path();
    let mut digest = load_digest_or_default(&path)?;
    let mut report = HeadlineReport::default();
    let feeds = &site.config.feeds;

    let targets: [(&str, &HeadlineFeedConfig, &mut Vec<Headline>, &mut usize); 2] = [
        ("Techmeme", &feeds.techmeme, &mut digest.techmeme, &mut report.techmeme),
        ("WSJ", &feeds.wsj, &mut digest.wsj, &mut report.wsj),
    ];
    let total = targets.len();

    for (i, (name, feed, slot, count)) in targets.into_iter().enumerate() {
        progress.step(i + 1, total, name);
        let mut items = services.fetcher.fetch_items(&feed.url, feed.limit).await;
        if items.is_empty() {
            warn!(feed = name, "no headlines fetched; keeping existing data");
            report.kept_existing.push(name.to_string());
            continue;
        }

        if let Some(summarizer) = &services.summarizer {
            report.translated += translate_headlines(summarizer, &mut items).await;
        }

        *count = items.len();
        *slot = items;
    }

    save_digest(&path, &digest)?;
    info!(
        techmeme = report.techmeme,
        wsj = report.wsj,
        translated = report.translated,
        "headlines refreshed"
    );
    Ok(report)
}

/// Fill `title_zh` in place; failures leave titles untranslated.
async fn translate_headlines(summarizer: &Summarizer, items: &mut [Headline]) -> usize {
    let titles: Vec<String> = items.iter().map(|h| h.title_en.clone()).collect();
    match summarizer.translate_titles(&titles).await {
        Ok(translations) => {
            for (index, title) in &translations {
                if let Some(item) = items.get_mut(*index) {
                    item.title_zh = title.clone();
                }
            }
            translations.len()
        }
        Err(e) => {
            warn!(error = %e, "title translation failed");
            0
        }
    }
}

// ---------------------------------------------------------------------------
// Deep analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisReport {
    pub checked: usize,
    pub updated: Vec<String>,
    /// `(source, error)` for updates that could not be processed.
    pub failed: Vec<(String, String)>,
}

/// List sources with unseen articles, without summarizing anything.
pub async fn pending_updates(site: &Site, fetcher: &Fetcher) -> Result<Vec<SourceUpdate>> {
    let state = AnalysisState::load(&site.state_path())?;
    let lookups = poll_sources(fetcher, &site.config.sources).await;
    Ok(check_for_updates(&site.config.sources, &state, &lookups))
}

/// Summarize new articles from every analysis source into the digest.
///
/// A source's link is only recorded once its summary is stored, so failed
/// sources are retried on the next run.
#[instrument(skip_all)]
pub async fn refresh_deep_analysis(
    site: &Site,
    services: &Services,
    progress: &dyn ProgressReporter,
) -> Result<AnalysisReport> {
    let state_path = site.state_path();
    let mut state = AnalysisState::load(&state_path)?;
    let lookups = poll_sources(&services.fetcher, &site.config.sources).await;
    let updates = check_for_updates(&site.config.sources, &state, &lookups);

    let mut report = AnalysisReport {
        checked: site.config.sources.len(),
        ..Default::default()
    };
    if updates.is_empty() {
        return Ok(report);
    }

    let Some(summarizer) = &services.summarizer else {
        for update in &updates {
            report
                .failed
                .push((update.name.clone(), "LLM API key not set".into()));
        }
        warn!(pending = updates.len(), "new articles found but summarizer is disabled");
        return Ok(report);
    };

    let news_path = site.news_path();
    let mut digest = load_digest_or_default(&news_path)?;

    for (i, update) in updates.iter().enumerate() {
        progress.step(i + 1, updates.len(), &update.name);
        match summarize_update(services, summarizer, update).await {
            Ok(record) => {
                digest.deep_analysis.insert(update.name.clone(), record);
                state.record(update.name.clone(), update.link.clone());
                report.updated.push(update.name.clone());
                info!(source = %update.name, "analysis updated");
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(source = %update.name, error = %e, "analysis failed; keeping existing data");
                report.failed.push((update.name.clone(), e.to_string()));
            }
        }
    }

    if !report.updated.is_empty() {
        save_digest(&news_path, &digest)?;
        state.save(&state_path)?;
    }
    Ok(report)
}

async fn summarize_update(
    services: &Services,
    summarizer: &Summarizer,
    update: &SourceUpdate,
) -> Result<ContentRecord> {
    let text = services.fetcher.fetch_article_text(&update.link).await?;
    let article = Article {
        title: update.title.clone(),
        link: update.link.clone(),
        text,
    };
    summarizer.summarize(&article).await
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Install the rendered news region.
pub fn apply_news(doc: &HostDocument, digest: &NewsDigest, date: NaiveDate) -> Result<HostDocument> {
    doc.replace_kind(RegionKind::DailyNews, &render_news_region(digest, date))
}

/// Render the news digest into the host document.
#[instrument(skip_all, fields(%date))]
pub fn render_news(site: &Site, date: NaiveDate) -> Result<()> {
    let index = site.index_path();
    let doc = HostDocument::load(&index)?;
    let digest = load_digest(&site.news_path())?;
    apply_news(&doc, &digest, date)?.save(&index)?;
    info!(
        techmeme = digest.techmeme.len(),
        wsj = digest.wsj.len(),
        analyses = digest.deep_analysis.len(),
        "news rendered"
    );
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodcastReport {
    pub episodes: usize,
    /// Snapshot of the previous page, when the highlighted episode changed.
    pub archived: Option<Snapshot>,
}

/// Install the podcast highlights, archiving the old page if its lead changed.
///
/// The snapshot is `<date>-podcast` and holds the page as it was before this
/// update.
pub fn apply_podcast(
    doc: &HostDocument,
    records: &[ContentRecord],
    limit: usize,
    archive_dir: &Path,
    date: NaiveDate,
) -> Result<(HostDocument, Option<Snapshot>)> {
    let current = doc.region_content(&RegionKind::PodcastHighlights.region())?;
    let fragment = render_podcast_region(records, limit);

    let previous_lead = highlighted_title(current);
    let next_lead = highlighted_title(&fragment);

    let archived = match previous_lead {
        Some(previous) if Some(&previous) != next_lead.as_ref() => {
            info!(%previous, next = ?next_lead, "highlighted episode changed");
            Some(archive_snapshot(doc, archive_dir, &format!("{date}-podcast"))?)
        }
        _ => None,
    };

    Ok((doc.replace_kind(RegionKind::PodcastHighlights, &fragment)?, archived))
}

/// Render podcast highlights; refresh inventories when a snapshot was taken.
#[instrument(skip_all, fields(%date))]
pub fn render_podcast(site: &Site, date: NaiveDate) -> Result<PodcastReport> {
    let index = site.index_path();
    let doc = HostDocument::load(&index)?;
    let records = load_podcasts(&site.podcast_path())?;

    let (mut doc, archived) = apply_podcast(
        &doc,
        &records,
        site.config.render.podcast_highlights,
        &site.archive_dir(),
        date,
    )?;

    let took_snapshot = archived.as_ref().is_some_and(|s| s.created);
    if took_snapshot
        && doc.has_region(RegionKind::DailyInventory)
        && doc.has_region(RegionKind::PodcastInventory)
    {
        let inventory = scan_inventory(&site.archive_dir())?;
        doc = update_inventories(&doc, &inventory, site.archive_href_prefix())?;
    }

    doc.save(&index)?;
    info!(episodes = records.len(), archived = took_snapshot, "podcast rendered");
    Ok(PodcastReport {
        episodes: records.len(),
        archived,
    })
}

// ---------------------------------------------------------------------------
// Archives
// ---------------------------------------------------------------------------

/// Regenerate both inventory regions from the archive directory.
#[instrument(skip_all)]
pub fn update_archives(site: &Site) -> Result<Inventory> {
    let index = site.index_path();
    let doc = HostDocument::load(&index)?;
    let inventory = scan_inventory(&site.archive_dir())?;
    update_inventories(&doc, &inventory, site.archive_href_prefix())?.save(&index)?;
    Ok(inventory)
}

/// Snapshot the current host document under `label`.
pub fn archive_page(site: &Site, label: &str) -> Result<Snapshot> {
    let doc = HostDocument::load(&site.index_path())?;
    archive_snapshot(&doc, &site.archive_dir(), label)
}

// ---------------------------------------------------------------------------
// Daily run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub publish: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { publish: true }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub date: NaiveDate,
    pub headlines: HeadlineReport,
    pub analysis: AnalysisReport,
    pub snapshot: Snapshot,
    pub published: Option<PublishOutcome>,
    pub elapsed: Duration,
}

/// Headlines, deep analysis, news render, daily snapshot, inventories, publish.
#[instrument(skip_all, fields(%date))]
pub async fn run_daily(
    site: &Site,
    services: &Services,
    date: NaiveDate,
    opts: &RunOptions,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let start = Instant::now();
    let run_id = RunId::new();
    info!(%run_id, site = %site.root.display(), "starting daily run");

    // Fail on a missing page before touching the network.
    let index = site.index_path();
    let doc = HostDocument::load(&index)?;
    doc.validate_markers()?;

    progress.phase("Refreshing headlines");
    let headlines = refresh_headlines(site, services, progress).await?;

    progress.phase("Checking analysis sources");
    let analysis = refresh_deep_analysis(site, services, progress).await?;

    progress.phase("Rendering news");
    let digest = load_digest(&site.news_path())?;
    let doc = apply_news(&doc, &digest, date)?;

    progress.phase("Archiving");
    let archive_dir = site.archive_dir();
    let snapshot = archive_snapshot(&doc, &archive_dir, &date.to_string())?;
    let inventory = scan_inventory(&archive_dir)?;
    let doc = update_inventories(&doc, &inventory, site.archive_href_prefix())?;
    doc.save(&index)?;

    let published = if opts.publish && site.config.publish.enabled {
        progress.phase("Publishing");
        let message = format!("{}: daily curation {date}", site.config.publish.commit_prefix);
        Some(publish(&site.root, &site.config.publish.files, &message)?)
    } else {
        None
    };

    let report = RunReport {
        run_id,
        date,
        headlines,
        analysis,
        snapshot,
        published,
        elapsed: start.elapsed(),
    };
    progress.done(&report);
    info!(
        run_id = %report.run_id,
        updated = report.analysis.updated.len(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "daily run complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curation_shared::{LlmConfig, SourceConfig};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><body>
<main>
            <!-- DAILY_NEWS_START --><p>old news</p><!-- DAILY_NEWS_END -->
<section><!-- PODCAST_HIGHLIGHTS_START --><!-- PODCAST_HIGHLIGHTS_END --></section>
</main>
<aside>
<ul><!-- DAILY_INVENTORY_START --><!-- DAILY_INVENTORY_END --></ul>
<ul><!-- PODCAST_INVENTORY_START --><!-- PODCAST_INVENTORY_END --></ul>
</aside>
</body></html>"#;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn site(dir: &Path) -> Site {
        std::fs::write(dir.join("index.html"), PAGE).unwrap();
        Site::new(dir, AppConfig::default())
    }

    fn fixture(name: &str) -> String {
        let path = format!("../../../fixtures/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn region(doc: &HostDocument, kind: RegionKind) -> String {
        doc.region_content(&kind.region()).unwrap().to_string()
    }

    #[test]
    fn render_news_needs_digest() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        let err = render_news(&site, date()).unwrap_err();
        assert!(matches!(err, CurationError::NotFound { .. }));
        assert_eq!(std::fs::read_to_string(site.index_path()).unwrap(), PAGE);
    }

    #[test]
    fn render_news_from_legacy_digest() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        std::fs::write(site.news_path(), fixture("json/daily_news_legacy.json")).unwrap();

        render_news(&site, date()).unwrap();

        let doc = HostDocument::load(&site.index_path()).unwrap();
        let news = region(&doc, RegionKind::DailyNews);
        assert!(news.contains("晶片出口規定收緊"));
        assert!(news.contains("聚合者的兩難"));
        assert!(!news.contains("old news"));
        // Running twice gives the same page.
        render_news(&site, date()).unwrap();
        assert_eq!(HostDocument::load(&site.index_path()).unwrap(), doc);
    }

    #[test]
    fn missing_marker_aborts_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path(), AppConfig::default());
        let page = "<html><!-- PODCAST_HIGHLIGHTS_START --><!-- PODCAST_HIGHLIGHTS_END --></html>";
        std::fs::write(site.index_path(), page).unwrap();
        std::fs::write(site.news_path(), r#"{"techmeme": []}"#).unwrap();

        let err = render_news(&site, date()).unwrap_err();
        assert!(matches!(err, CurationError::RegionNotFound { .. }));
        assert_eq!(std::fs::read_to_string(site.index_path()).unwrap(), page);
    }

    #[test]
    fn podcast_change_archives_previous_page() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());

        std::fs::write(site.podcast_path(), json!([{"title": "第一集", "date": "2026-10-10"}]).to_string())
            .unwrap();
        let first = render_podcast(&site, date()).unwrap();
        assert_eq!(first.archived, None);

        std::fs::write(
            site.podcast_path(),
            fixture("json/podcast_data.json"),
        )
        .unwrap();
        let second = render_podcast(&site, date()).unwrap();
        let snapshot = second.archived.expect("snapshot taken");
        assert!(snapshot.created);
        assert_eq!(snapshot.path, site.archive_dir().join("2026-10-18-podcast.html"));

        let doc = HostDocument::load(&site.index_path()).unwrap();
        let inventory = region(&doc, RegionKind::PodcastInventory);
        assert!(inventory.contains("archive/2026-10-18-podcast.html"));
        assert!(inventory.contains("🎙️ 第一集 (2026-10-18)"));

        // Same lead again: no new snapshot.
        let third = render_podcast(&site, date()).unwrap();
        assert_eq!(third.archived, None);
    }

    #[test]
    fn podcast_single_object_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        assert!(matches!(
            render_podcast(&site, date()).unwrap_err(),
            CurationError::NotFound { .. }
        ));

        std::fs::write(site.podcast_path(), r#"{"title": "單集", "chapters": []}"#).unwrap();
        let report = render_podcast(&site, date()).unwrap();
        assert_eq!(report.episodes, 1);
        let doc = HostDocument::load(&site.index_path()).unwrap();
        assert!(region(&doc, RegionKind::PodcastHighlights).contains(r#"<div class="podcast-chapters"></div>"#));
    }

    #[test]
    fn update_archives_lists_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        std::fs::create_dir_all(site.archive_dir()).unwrap();
        std::fs::write(site.archive_dir().join("2026-10-17.html"), "<p>x</p>").unwrap();

        let inventory = update_archives(&site).unwrap();
        assert_eq!(inventory.daily.len(), 1);

        let doc = HostDocument::load(&site.index_path()).unwrap();
        assert!(region(&doc, RegionKind::DailyInventory).contains("📄 2026-10-17"));
        assert_eq!(
            region(&doc, RegionKind::PodcastInventory),
            "<li>尚無 Podcast 存檔</li>\n                "
        );
    }

    #[tokio::test]
    async fn daily_run_end_to_end() {
        let server = MockServer::start().await;
        let rss = fixture("feeds/rss.xml");
        for route in ["/techmeme", "/wsj", "/analysis"] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_string(rss.clone()))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture("html/article.html")))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.feeds.techmeme = HeadlineFeedConfig {
            url: format!("{}/techmeme", server.uri()),
            limit: 2,
        };
        config.feeds.wsj = HeadlineFeedConfig {
            url: format!("{}/wsj", server.uri()),
            limit: 1,
        };
        config.sources = vec![SourceConfig {
            name: "Stratechery".into(),
            rss: format!("{}/analysis", server.uri()),
            prompt_type: "analysis".into(),
        }];
        std::fs::write(dir.path().join("index.html"), PAGE).unwrap();
        let site = Site::new(dir.path(), config);

        // No API key: headlines still refresh, analysis is deferred.
        let services = Services {
            fetcher: Fetcher::new(&site.config.fetch).unwrap(),
            summarizer: None,
        };
        let opts = RunOptions { publish: false };
        let report = run_daily(&site, &services, date(), &opts, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.headlines.techmeme, 2);
        assert_eq!(report.headlines.wsj, 1);
        assert_eq!(report.analysis.failed.len(), 1);
        assert!(report.published.is_none());
        assert!(AnalysisState::load(&site.state_path()).unwrap().is_empty());

        let doc = HostDocument::load(&site.index_path()).unwrap();
        assert!(region(&doc, RegionKind::DailyNews).contains("The Aggregator&#39;s Dilemma"));
        assert!(region(&doc, RegionKind::DailyInventory).contains("archive/2026-10-18.html"));
        assert!(report.snapshot.created);
        assert_eq!(report.snapshot.path, site.archive_dir().join("2026-10-18.html"));
        assert!(report.snapshot.path.exists());
    }

    #[tokio::test]
    async fn deep_analysis_records_state_on_success() {
        let server = MockServer::start().await;
        let feed = r#"<rss><channel><item><title>New Post</title><link>__BASE__/article</link></item></channel></rss>"#
            .replace("__BASE__", &server.uri());
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture("html/article.html")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text":
                    "{\"title\": \"新文章\", \"analysis_zh\": \"<p>摘要</p>\", \"insights\": [\"一\"]}"
                }]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.sources = vec![SourceConfig {
            name: "Example".into(),
            rss: format!("{}/feed", server.uri()),
            prompt_type: "analysis".into(),
        }];
        config.llm = LlmConfig {
            base_url: server.uri(),
            ..LlmConfig::default()
        };
        let site = Site::new(dir.path(), config);
        let services = Services {
            fetcher: Fetcher::new(&site.config.fetch).unwrap(),
            summarizer: Some(Summarizer::new(&site.config.llm, "k".into()).unwrap()),
        };

        let report = refresh_deep_analysis(&site, &services, &SilentProgress).await.unwrap();
        assert_eq!(report.updated, vec!["Example".to_string()]);

        let digest = load_digest(&site.news_path()).unwrap();
        assert_eq!(digest.deep_analysis["Example"].summary, "<p>摘要</p>");
        let state = AnalysisState::load(&site.state_path()).unwrap();
        assert_eq!(state.last_link("Example"), Some(format!("{}/article", server.uri()).as_str()));

        // Second pass sees no change and makes no LLM call.
        let again = refresh_deep_analysis(&site, &services, &SilentProgress).await.unwrap();
        assert!(again.updated.is_empty());
    }

    #[tokio::test]
    async fn failing_feed_and_source_keep_existing_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/techmeme"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture("feeds/rss.xml")))
            .mount(&server)
            .await;
        for route in ["/wsj", "/b-article"] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;
        }
        for source in ["a", "b"] {
            let feed = format!(
                "<rss><channel><item><title>Post {source}</title><link>{}/{source}-article</link></item></channel></rss>",
                server.uri()
            );
            Mock::given(method("GET"))
                .and(path(format!("/{source}-feed")))
                .respond_with(ResponseTemplate::new(200).set_body_string(feed))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/a-article"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture("html/article.html")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text":
                    "{\"title\": \"新摘要\", \"analysis_zh\": \"<p>新</p>\", \"insights\": []}"
                }]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.feeds.techmeme = HeadlineFeedConfig {
            url: format!("{}/techmeme", server.uri()),
            limit: 2,
        };
        config.feeds.wsj = HeadlineFeedConfig {
            url: format!("{}/wsj", server.uri()),
            limit: 2,
        };
        config.sources = ["A", "B"]
            .into_iter()
            .map(|name| SourceConfig {
                name: name.into(),
                rss: format!("{}/{}-feed", server.uri(), name.to_lowercase()),
                prompt_type: "analysis".into(),
            })
            .collect();
        config.llm = LlmConfig {
            base_url: server.uri(),
            ..LlmConfig::default()
        };
        let site = Site::new(dir.path(), config);

        let old_wsj = vec![Headline {
            title_en: "Yesterday's Story".into(),
            url: "https://example.com/yesterday".into(),
            ..Headline::default()
        }];
        let old_b = ContentRecord {
            title: "舊分析".into(),
            summary: "<p>舊</p>".into(),
            ..ContentRecord::default()
        };
        let mut seeded = NewsDigest {
            wsj: old_wsj.clone(),
            ..NewsDigest::default()
        };
        seeded.deep_analysis.insert("B".into(), old_b.clone());
        save_digest(&site.news_path(), &seeded).unwrap();

        let headline_services = Services {
            fetcher: Fetcher::new(&site.config.fetch).unwrap(),
            summarizer: None,
        };
        let headlines = refresh_headlines(&site, &headline_services, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(headlines.kept_existing, vec!["WSJ".to_string()]);
        assert_eq!(headlines.techmeme, 2);
        assert_eq!(headlines.wsj, 0);

        let services = Services {
            fetcher: Fetcher::new(&site.config.fetch).unwrap(),
            summarizer: Some(Summarizer::new(&site.config.llm, "k".into()).unwrap()),
        };
        let analysis = refresh_deep_analysis(&site, &services, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(analysis.updated, vec!["A".to_string()]);
        assert_eq!(analysis.failed.len(), 1);
        assert_eq!(analysis.failed[0].0, "B");

        let digest = load_digest(&site.news_path()).unwrap();
        assert_eq!(digest.wsj, old_wsj);
        assert_eq!(digest.techmeme.len(), 2);
        assert_eq!(digest.deep_analysis["B"], old_b);
        assert_eq!(digest.deep_analysis["A"].summary, "<p>新</p>");

        let state = AnalysisState::load(&site.state_path()).unwrap();
        assert_eq!(state.last_link("A"), Some(format!("{}/a-article", server.uri()).as_str()));
        assert_eq!(state.last_link("B"), None);
    }
}
