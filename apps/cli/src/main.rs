//! Daily curation CLI.
//!
//! Refreshes headline feeds and deep-analysis summaries, renders them into
//! the marked regions of the site's `index.html`, archives snapshots, and
//! publishes the result with git.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
