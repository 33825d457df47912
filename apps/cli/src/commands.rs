//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use curation_core::pipeline::{
    self, ProgressReporter, RunOptions, RunReport, Services, Site, pending_updates,
};
use curation_core::{PublishOutcome, publish};
use curation_fetch::{FeedLookup, Fetcher};
use curation_shared::{AppConfig, init_config, load_config};
use curation_transcript::{TranscriptFetcher, clean_vtt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Daily curation: feeds, summaries, and a self-updating page.
#[derive(Parser)]
#[command(
    name = "curation",
    version,
    about = "Refresh feeds and summaries, render them into index.html, archive and publish.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Site directory holding index.html and the data files.
    #[arg(long, default_value = ".", global = true)]
    pub site: PathBuf,

    /// Config file (defaults to <site>/curation.toml, then the global config).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Full daily run: headlines, analysis, render, archive, publish.
    Run {
        /// Skip the git commit and push.
        #[arg(long)]
        no_publish: bool,

        /// Date shown on the page and used for the snapshot (YYYY-MM-DD).
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List analysis sources with unseen articles.
    CheckUpdates,

    /// Render the news digest into the page.
    RenderNews {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Render podcast highlights into the page.
    RenderPodcast {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Regenerate the archive inventories.
    UpdateArchives,

    /// Snapshot the current page into the archive.
    Archive {
        /// Snapshot name (defaults to today's date).
        #[arg(long)]
        label: Option<String>,
    },

    /// Strip timing and markup from a WebVTT caption file.
    CleanTranscript {
        /// Input .vtt file.
        input: PathBuf,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// One caption line per output line instead of a single paragraph.
        #[arg(long)]
        lines: bool,
    },

    /// Fetch a video transcript and print it as JSON.
    Transcript {
        /// Video URL or 11-character ID.
        video: String,
    },

    /// Print the title of a web page.
    Title { url: String },

    /// Print the newest entry of an RSS/Atom feed.
    Latest {
        /// Feed URL.
        feed_url: String,
    },

    /// Commit and push the configured site files.
    Publish {
        /// Commit message (defaults to "<prefix>: manual publish <date>").
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a default curation.toml into the site directory.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "curation=info",
        1 => "curation=debug",
        _ => "curation=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let site_dir = cli.site;
    let explicit = cli.config.as_deref();

    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(&site_dir),
            ConfigAction::Show => cmd_config_show(&site_dir, explicit),
        },
        Command::CleanTranscript { input, out, lines } => {
            cmd_clean_transcript(&input, out.as_deref(), lines)
        }
        command => {
            let site = Site::new(&site_dir, load_config(&site_dir, explicit)?);
            dispatch(&site, command).await
        }
    }
}

async fn dispatch(site: &Site, command: Command) -> Result<()> {
    match command {
        Command::Run { no_publish, date } => cmd_run(site, !no_publish, or_today(date)).await,
        Command::CheckUpdates => cmd_check_updates(site).await,
        Command::RenderNews { date } => {
            pipeline::render_news(site, or_today(date))?;
            println!("News region updated in {}", site.index_path().display());
            Ok(())
        }
        Command::RenderPodcast { date } => cmd_render_podcast(site, or_today(date)),
        Command::UpdateArchives => cmd_update_archives(site),
        Command::Archive { label } => cmd_archive(site, label),
        Command::Transcript { video } => cmd_transcript(&site.config, &video).await,
        Command::Title { url } => {
            let fetcher = Fetcher::new(&site.config.fetch)?;
            println!("{}", fetcher.fetch_page_title(&url).await?);
            Ok(())
        }
        Command::Latest { feed_url } => cmd_latest(&site.config, &feed_url).await,
        Command::Publish { message } => cmd_publish(site, message),
        Command::Config { .. } | Command::CleanTranscript { .. } => {
            Err(eyre!("command does not need a site"))
        }
    }
}

fn or_today(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(site: &Site, publish: bool, date: NaiveDate) -> Result<()> {
    let services = Services::from_config(&site.config)?;
    info!(site = %site.root.display(), %date, publish, "starting daily run");

    let reporter = CliProgress::new();
    let report = pipeline::run_daily(site, &services, date, &RunOptions { publish }, &reporter)
        .await?;

    println!();
    println!("  Daily run complete ({})", report.run_id);
    println!("  Techmeme:  {}", report.headlines.techmeme);
    println!("  WSJ:       {}", report.headlines.wsj);
    println!("  Analysis:  {} updated", report.analysis.updated.len());
    for (source, error) in &report.analysis.failed {
        println!("    ! {source}: {error}");
    }
    let note = if report.snapshot.created { "" } else { " (kept existing)" };
    println!("  Snapshot:  {}{note}", report.snapshot.path.display());
    match report.published {
        Some(PublishOutcome::Published) => println!("  Publish:   pushed"),
        Some(PublishOutcome::NothingToCommit) => println!("  Publish:   nothing to commit"),
        None => println!("  Publish:   skipped"),
    }
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_check_updates(site: &Site) -> Result<()> {
    let fetcher = Fetcher::new(&site.config.fetch)?;
    let updates = pending_updates(site, &fetcher).await?;

    if updates.is_empty() {
        println!("No new articles.");
        return Ok(());
    }
    for update in &updates {
        println!("{}: {}", update.name, update.title);
        println!("  {}", update.link);
    }
    Ok(())
}

fn cmd_render_podcast(site: &Site, date: NaiveDate) -> Result<()> {
    let report = pipeline::render_podcast(site, date)?;
    println!("Podcast highlights updated ({} episodes)", report.episodes);
    if let Some(snapshot) = report.archived.filter(|s| s.created) {
        println!("Previous page archived to {}", snapshot.path.display());
    }
    Ok(())
}

fn cmd_update_archives(site: &Site) -> Result<()> {
    let inventory = pipeline::update_archives(site)?;
    println!(
        "Inventories updated: {} daily, {} podcast",
        inventory.daily.len(),
        inventory.podcast.len()
    );
    Ok(())
}

fn cmd_archive(site: &Site, label: Option<String>) -> Result<()> {
    let label = label.unwrap_or_else(|| or_today(None).to_string());
    let snapshot = pipeline::archive_page(site, &label)?;
    if snapshot.created {
        println!("Archived to {}", snapshot.path.display());
    } else {
        println!("Snapshot {} already exists, kept", snapshot.path.display());
    }
    Ok(())
}

fn cmd_clean_transcript(input: &Path, out: Option<&Path>, lines: bool) -> Result<()> {
    let raw = std::fs::read_to_string(input)
        .map_err(|e| eyre!("cannot read '{}': {e}", input.display()))?;
    let cleaned = clean_vtt(&raw);
    let text = if lines {
        cleaned.join("\n")
    } else {
        cleaned.join(" ")
    };

    match out {
        Some(path) => {
            std::fs::write(path, format!("{text}\n"))
                .map_err(|e| eyre!("cannot write '{}': {e}", path.display()))?;
            info!(lines = cleaned.len(), out = %path.display(), "transcript cleaned");
        }
        None => println!("{text}"),
    }
    Ok(())
}

async fn cmd_transcript(config: &AppConfig, video: &str) -> Result<()> {
    let fetcher = TranscriptFetcher::new(&config.fetch, &config.transcript)?;
    let result = fetcher.fetch_transcript(video).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.success {
        Ok(())
    } else {
        Err(eyre!(
            "transcript unavailable: {}",
            result.error.as_deref().unwrap_or("unknown error")
        ))
    }
}

async fn cmd_latest(config: &AppConfig, feed_url: &str) -> Result<()> {
    let fetcher = Fetcher::new(&config.fetch)?;
    match fetcher.fetch_latest(feed_url).await {
        FeedLookup::Found { link, title } => {
            println!("{title}");
            println!("{link}");
            Ok(())
        }
        FeedLookup::NotFound { reason } => Err(eyre!("no entry found: {reason}")),
    }
}

fn cmd_publish(site: &Site, message: Option<String>) -> Result<()> {
    let message = message.unwrap_or_else(|| {
        format!("{}: manual publish {}", site.config.publish.commit_prefix, or_today(None))
    });
    match publish(&site.root, &site.config.publish.files, &message)? {
        PublishOutcome::Published => println!("Published."),
        PublishOutcome::NothingToCommit => println!("Nothing to commit."),
    }
    Ok(())
}

fn cmd_config_init(site_dir: &Path) -> Result<()> {
    let path = init_config(site_dir)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(site_dir: &Path, explicit: Option<&Path>) -> Result<()> {
    let config: AppConfig = load_config(site_dir, explicit)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn step(&self, current: usize, total: usize, detail: &str) {
        self.spinner.set_message(format!("[{current}/{total}] {detail}"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

// Clears the spinner when a run fails before `done`.
impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_is_cleared_when_run_aborts() {
        let reporter = CliProgress::new();
        reporter.phase("Refreshing headlines");
        let spinner = reporter.spinner.clone();
        drop(reporter);
        assert!(spinner.is_finished());
    }
}
