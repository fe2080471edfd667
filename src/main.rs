mod error;
mod models;
mod output;
mod scrapers;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use scrapers::{ChromeDriver, ScoutConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Scrape material property tables from MatWeb into a JSON file
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// TOML file with `[site]` selectors and `[run]` parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// First collected link to extract (inclusive)
    #[arg(long)]
    start: Option<usize>,

    /// Last collected link to extract (exclusive)
    #[arg(long)]
    end: Option<usize>,

    /// Stop paginating once this many links are collected (defaults to --end)
    #[arg(long)]
    target: Option<usize>,

    /// Output JSON file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Longest time to wait for any page or element, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Rewrite the output file after every N materials
    #[arg(long)]
    flush_every: Option<usize>,

    /// Skip materials that fail to load or parse instead of aborting
    #[arg(long)]
    continue_on_error: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ScoutConfig> {
        let mut config = match &self.config {
            Some(path) => ScoutConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ScoutConfig::default(),
        };

        let run = &mut config.run;
        if let Some(start) = self.start {
            run.start = start;
        }
        if let Some(end) = self.end {
            run.end = end;
        }
        if self.target.is_some() {
            run.target_count = self.target;
        }
        if let Some(output) = self.output {
            run.output = output;
        }
        if let Some(secs) = self.timeout_secs {
            run.wait_timeout_secs = secs;
        }
        if self.headed {
            run.headless = false;
        }
        if self.flush_every.is_some() {
            run.flush_every = self.flush_every;
        }
        if self.continue_on_error {
            run.continue_on_error = true;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "material_scout=info".into()),
        )
        .init();

    let config = Args::parse().into_config()?;

    info!("🧪 Material Scout - MatWeb property scraper");
    info!(
        "Extracting links {}..{} into {}",
        config.run.start,
        config.run.end,
        config.run.output.display()
    );

    let output_path = config.run.output.clone();
    let checkpoint = output::Checkpoint::new(&output_path, config.run.flush_every);

    let extraction = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let mut driver = ChromeDriver::launch(config.run.headless, config.run.wait_timeout())
            .context("Failed to start the browser")?;
        scrapers::scrape(&mut driver, &config, |records| checkpoint.observe(records))
            .map_err(anyhow::Error::from)
    })
    .await
    .context("Scrape task panicked")??;

    info!("Scraping completed. Saving data...");
    output::save(&output_path, &extraction.records)
        .await
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    info!(
        "✅ Scraped {} materials ({} skipped)",
        extraction.records.len(),
        extraction.skipped.len()
    );

    Ok(())
}
