//! # Result Aggregator
//!
//! Shared sink for worker outcomes. Successful results and permanent
//! failures are recorded under one lock so the check-then-write for a key is
//! atomic with respect to other workers.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::ScanResult;

/// Whether a successful write created or replaced the entry for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Replaced,
}

/// Everything a crawl produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlReport {
    pub results: BTreeMap<String, ScanResult>,
    /// Keys that exhausted their retry budget, in failure order
    pub failed: Vec<String>,
}

impl CrawlReport {
    pub fn succeeded_count(&self) -> usize {
        self.results.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

#[derive(Debug, Default)]
pub struct ResultAggregator {
    state: Mutex<CrawlReport>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a non-empty result; the last writer for a key wins
    pub fn record_success(&self, key: &str, result: ScanResult) -> WriteOutcome {
        let mut state = self.state.lock();
        match state.results.insert(key.to_string(), result) {
            None => WriteOutcome::Inserted,
            Some(_) => WriteOutcome::Replaced,
        }
    }

    pub fn record_failure(&self, key: &str) {
        self.state.lock().failed.push(key.to_string());
    }

    pub fn snapshot(&self) -> CrawlReport {
        self.state.lock().clone()
    }

    pub fn into_report(self) -> CrawlReport {
        self.state.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn result(stars: u64) -> ScanResult {
        [("stars".to_string(), Value::from(stars))].into_iter().collect()
    }

    #[test]
    fn test_last_writer_wins_and_is_reported() {
        let aggregator = ResultAggregator::new();
        assert_eq!(
            aggregator.record_success("alice:foo", result(1)),
            WriteOutcome::Inserted
        );
        assert_eq!(
            aggregator.record_success("alice:foo", result(2)),
            WriteOutcome::Replaced
        );

        let report = aggregator.snapshot();
        assert_eq!(report.succeeded_count(), 1);
        assert_eq!(report.results["alice:foo"].metric_f64("stars"), Some(2.0));
    }

    #[test]
    fn test_failures_keep_order() {
        let aggregator = ResultAggregator::new();
        aggregator.record_failure("bob:bar");
        aggregator.record_failure("carol:baz");

        let report = aggregator.into_report();
        assert_eq!(report.failed, vec!["bob:bar", "carol:baz"]);
        assert!(report.results.is_empty());
    }
}
