//! # Orchestration
//!
//! Concurrent processing of discovered repositories: a shared job queue, a
//! pool of tokio workers applying the retry policy, and a locked aggregator
//! collecting results and permanent failures.

pub mod aggregator;
pub mod crawl;
pub mod job_queue;
pub mod worker_pool;

pub use aggregator::{CrawlReport, ResultAggregator, WriteOutcome};
pub use crawl::{log_summary, run_crawl};
pub use job_queue::JobQueue;
pub use worker_pool::{PoolRun, TerminationPolicy, WorkerPool, WorkerStats};
