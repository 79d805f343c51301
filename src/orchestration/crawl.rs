//! Top-level crawl: discover, drain the pool, summarize, write output.

use std::path::Path;
use tracing::{error, info};

use super::aggregator::CrawlReport;
use super::worker_pool::WorkerPool;
use crate::discovery::{DiscoveryQuery, RepositoryDiscovery};
use crate::error::Result;
use crate::output::write_results;

/// Run one crawl end to end.
///
/// The output file is written even when every repository failed (or none
/// were discovered); only an I/O or serialization failure on that write is
/// returned as an error.
pub async fn run_crawl(
    discovery: &dyn RepositoryDiscovery,
    pool: &WorkerPool,
    query: &DiscoveryQuery,
    output_path: &Path,
) -> Result<CrawlReport> {
    let repositories = discovery.discover(query).await;
    info!(
        discovered = repositories.len(),
        requested = query.count,
        "Starting crawl"
    );

    let report = pool.run(repositories).await;
    log_summary(&report);

    write_results(output_path, &report.results)?;
    info!(path = %output_path.display(), "Results written");

    Ok(report)
}

/// Emit the end-of-run summary lines
pub fn log_summary(report: &CrawlReport) {
    if !report.failed.is_empty() {
        error!(
            "Evaluation failed for {} repositories: {}",
            report.failed_count(),
            report.failed.join(", ")
        );
    }
    if !report.results.is_empty() {
        info!(
            "Evaluation succeeded for {} repositories.",
            report.succeeded_count()
        );
    }
}
