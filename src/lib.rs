#![allow(clippy::doc_markdown)] // Allow technical terms like SonarQube, GitHub in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Smell of Stars
//!
//! Crawls public repositories, runs static analysis on each one, and
//! collects size-normalized code quality metrics keyed by `owner:name`, so
//! that popular and ordinary repositories can be compared.
//!
//! ## Architecture
//!
//! A crawl is a bounded pool of tokio workers draining a shared job queue.
//! Each job runs the scan lifecycle (acquire sources, trigger analysis, poll
//! for measures, normalize, release) and either succeeds, is requeued with
//! its attempt counter bumped, or is recorded as a permanent failure after
//! three attempts. Results and failures land in one locked aggregator and are
//! written out as a single JSON document at the end of the run.
//!
//! ## Module Organization
//!
//! - [`models`] - Repository, job and scan result types
//! - [`state_machine`] - Job lifecycle states and the retry policy
//! - [`orchestration`] - Job queue, result aggregator, worker pool, crawl driver
//! - [`scanning`] - Scan engine and its source/analysis collaborators
//! - [`discovery`] - Repository search
//! - [`output`] - Result file writer
//! - [`evaluation`] - Statistics over crawl result files
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Crate-level error type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smell_of_stars::config::ConfigManager;
//! use smell_of_stars::discovery::{DiscoveryQuery, GitHubClient};
//! use smell_of_stars::orchestration::{run_crawl, WorkerPool};
//! use smell_of_stars::scanning::ScanEngine;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::load(None)?.into_config();
//! let discovery = GitHubClient::new(&config.github)?;
//! let pool = WorkerPool::new(config.pool.clone(), Arc::new(ScanEngine::from_config(&config)?));
//!
//! let query = DiscoveryQuery::new(20).with_language("Python");
//! let report = run_crawl(&discovery, &pool, &query, Path::new("out/python.json")).await?;
//! println!("{} succeeded, {} failed", report.succeeded_count(), report.failed_count());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod evaluation;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod output;
pub mod scanning;
pub mod state_machine;

pub use config::{ConfigManager, CrawlerConfig};
pub use constants::MAX_ATTEMPTS;
pub use discovery::{DiscoveryQuery, GitHubClient, RepositoryDiscovery};
pub use error::{CrawlerError, Result};
pub use models::{Job, Repository, ScanResult};
pub use orchestration::{run_crawl, CrawlReport, TerminationPolicy, WorkerPool};
pub use scanning::{ScanEngine, Scanner};
