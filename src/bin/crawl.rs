//! # Repository Crawler
//!
//! Discovers repositories matching the given filters, scans each one with
//! the configured analysis service and writes the normalized metrics to a
//! JSON file keyed by `owner:name`.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use smell_of_stars::config::{ConfigManager, TerminationPolicy};
use smell_of_stars::discovery::{DiscoveryQuery, GitHubClient};
use smell_of_stars::logging::init_structured_logging;
use smell_of_stars::orchestration::{run_crawl, WorkerPool};
use smell_of_stars::scanning::ScanEngine;

#[derive(Parser, Debug)]
#[command(name = "crawl")]
#[command(about = "Crawl repositories and collect normalized code quality metrics")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Number of repositories to crawl
    #[arg(short = 'n', long)]
    count: usize,

    /// Programming language to consider
    #[arg(short, long)]
    language: Option<String>,

    /// Minimum number of stars
    #[arg(long)]
    min_stars: Option<u64>,

    /// Maximum number of stars (unconstrained when omitted)
    #[arg(long)]
    max_stars: Option<u64>,

    /// Result file to write
    #[arg(short, long)]
    output: PathBuf,

    /// Configuration file (default: config/crawler.toml if present)
    #[arg(short, long, env = "CRAWLER_CONFIG")]
    config: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// When idle workers stop: drain or eager
    #[arg(long)]
    termination: Option<TerminationPolicy>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut manager =
        ConfigManager::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(workers) = cli.workers {
        manager.config_mut().pool.workers = workers;
    }
    if let Some(termination) = cli.termination {
        manager.config_mut().pool.termination = termination;
    }
    manager
        .config()
        .validate()
        .context("Invalid command-line overrides")?;
    let config = manager.into_config();

    init_structured_logging("crawl", &config.logging);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "\"The smell of Stars\" repository crawler (uses SonarQube and the GitHub REST API)"
    );

    let discovery = GitHubClient::new(&config.github).context("Invalid GitHub configuration")?;
    let engine = ScanEngine::from_config(&config).context("Invalid SonarQube configuration")?;
    let pool = WorkerPool::new(config.pool.clone(), Arc::new(engine));

    let mut query = DiscoveryQuery::new(cli.count).with_stars(cli.min_stars, cli.max_stars);
    if let Some(language) = cli.language {
        query = query.with_language(language);
    }

    let report = run_crawl(&discovery, &pool, &query, &cli.output).await?;

    info!(
        path = %cli.output.display(),
        succeeded = report.succeeded_count(),
        failed = report.failed_count(),
        "The repository crawler is done"
    );
    Ok(())
}
