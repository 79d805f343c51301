//! # Worker Pool
//!
//! A fixed number of tokio tasks drain the shared [`JobQueue`]. Each worker
//! claims a job, runs the scanner, and either records the result, requeues
//! the job with its failure count bumped, or records a permanent failure once
//! the retry ceiling is reached.
//!
//! Scanner panics are caught per job and treated as an empty result, so one
//! misbehaving repository never takes a worker down.
//!
//! A key is scanned by at most one worker at a time. A worker that dequeues a
//! job whose key is already in flight puts it back without spending an
//! attempt, so duplicate repositories are scanned one after another.

use dashmap::DashSet;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::aggregator::{CrawlReport, ResultAggregator, WriteOutcome};
use super::job_queue::JobQueue;
use crate::config::PoolConfig;
use crate::logging::{log_error, log_job_operation};
use crate::models::{Job, Repository, ScanResult};
use crate::scanning::{ScanError, Scanner};
use crate::state_machine::{JobEvent, JobState, RetryPolicy};

pub use crate::config::TerminationPolicy;

/// Per-worker counters returned when a worker exits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub scans: usize,
    pub succeeded: usize,
    pub requeued: usize,
    pub permanently_failed: usize,
    pub panics: usize,
    /// Times the worker found the queue empty but work still outstanding
    pub idle_waits: usize,
    /// Jobs put back because another worker was scanning the same key
    pub deferred: usize,
}

impl WorkerStats {
    fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Self::default()
        }
    }
}

/// Pool outcome: the aggregated report plus what each worker did
#[derive(Debug, Clone, Default)]
pub struct PoolRun {
    pub report: CrawlReport,
    pub workers: Vec<WorkerStats>,
    pub elapsed: Duration,
}

pub struct WorkerPool {
    config: PoolConfig,
    scanner: Arc<dyn Scanner>,
    retry_policy: RetryPolicy,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

impl WorkerPool {
    pub fn new(config: PoolConfig, scanner: Arc<dyn Scanner>) -> Self {
        Self {
            config,
            scanner,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Process every repository and return the aggregated report
    pub async fn run(&self, repositories: Vec<Repository>) -> CrawlReport {
        self.run_with_stats(repositories).await.report
    }

    /// Like [`WorkerPool::run`], also returning per-worker statistics
    pub async fn run_with_stats(&self, repositories: Vec<Repository>) -> PoolRun {
        let started = Instant::now();
        let queue: Arc<JobQueue> = Arc::new(repositories.into_iter().map(Job::new).collect());
        let aggregator = Arc::new(ResultAggregator::new());
        let in_flight = Arc::new(DashSet::new());
        let worker_count = self.config.workers.max(1);

        info!(
            workers = worker_count,
            jobs = queue.outstanding(),
            termination = %self.config.termination,
            "🏊 POOL: Starting workers"
        );

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let worker = Worker {
                id: worker_id,
                queue: queue.clone(),
                aggregator: aggregator.clone(),
                in_flight: in_flight.clone(),
                scanner: self.scanner.clone(),
                retry_policy: self.retry_policy,
                termination: self.config.termination,
                idle_backoff: self.config.idle_backoff(),
            };
            workers.spawn(worker.run());
        }

        let mut stats = Vec::with_capacity(worker_count);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(worker_stats) => stats.push(worker_stats),
                Err(e) => log_error("worker_pool", "join_worker", &e.to_string(), None),
            }
        }
        stats.sort_by_key(|s| s.worker_id);

        if !queue.is_empty() {
            // Only reachable if a worker task died outside the per-job panic guard
            warn!(
                remaining = queue.len(),
                "⚠️ POOL: Workers exited with jobs still queued"
            );
        }

        let report = aggregator.snapshot();
        let elapsed = started.elapsed();
        info!(
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "✅ POOL: All workers finished"
        );

        PoolRun {
            report,
            workers: stats,
            elapsed,
        }
    }
}

struct Worker {
    id: usize,
    queue: Arc<JobQueue>,
    aggregator: Arc<ResultAggregator>,
    /// Keys currently being scanned by some worker
    in_flight: Arc<DashSet<String>>,
    scanner: Arc<dyn Scanner>,
    retry_policy: RetryPolicy,
    termination: TerminationPolicy,
    idle_backoff: Duration,
}

impl Worker {
    async fn run(self) -> WorkerStats {
        let mut stats = WorkerStats::new(self.id);
        debug!(worker_id = self.id, "👷 WORKER: Started");

        loop {
            let Some(job) = self.queue.try_dequeue() else {
                match self.termination {
                    TerminationPolicy::Eager => break,
                    TerminationPolicy::Drain if self.queue.is_drained() => break,
                    TerminationPolicy::Drain => {
                        stats.idle_waits += 1;
                        tokio::time::sleep(self.idle_backoff).await;
                        continue;
                    }
                }
            };

            let key = job.key();
            if !self.in_flight.insert(key.clone()) {
                debug!(repository = %key, worker_id = self.id, "Key already in flight, deferring");
                stats.deferred += 1;
                self.queue.requeue(job);
                tokio::time::sleep(self.idle_backoff).await;
                continue;
            }

            self.process(job, &mut stats).await;
            self.in_flight.remove(&key);
        }

        debug!(
            worker_id = self.id,
            scans = stats.scans,
            succeeded = stats.succeeded,
            requeued = stats.requeued,
            deferred = stats.deferred,
            failed = stats.permanently_failed,
            "👷 WORKER: Exiting"
        );
        stats
    }

    async fn process(&self, mut job: Job, stats: &mut WorkerStats) {
        let key = job.key();
        let state = self.advance(&key, JobState::Pending, JobEvent::Claim);
        log_job_operation("claim", &key, job.current_attempt(), &state.to_string(), None);

        let result = self.scan_guarded(&job, stats).await;
        stats.scans += 1;

        if !result.is_empty() {
            let state = self.advance(&key, state, JobEvent::Succeed);
            if self.aggregator.record_success(&key, result) == WriteOutcome::Replaced {
                warn!(repository = %key, worker_id = self.id, "Result for key was overwritten");
            }
            self.queue.complete();
            stats.succeeded += 1;
            log_job_operation("succeed", &key, job.current_attempt(), &state.to_string(), None);
            return;
        }

        let attempt = job.current_attempt();
        let failed_attempts = job.record_failure();
        let state = self.advance(&key, state, JobEvent::Fail { failed_attempts });

        if state == JobState::Pending {
            let details = format!(
                "attempt {attempt} of {} returned no measures, requeueing",
                self.retry_policy.max_attempts()
            );
            log_job_operation("requeue", &key, attempt, &state.to_string(), Some(&details));
            self.queue.requeue(job);
            stats.requeued += 1;
        } else {
            error!(
                repository = %key,
                attempts = failed_attempts,
                "Giving up on repository after {failed_attempts} failed attempts"
            );
            self.aggregator.record_failure(&key);
            self.queue.complete();
            stats.permanently_failed += 1;
            log_job_operation("give_up", &key, attempt, &state.to_string(), None);
        }
    }

    async fn scan_guarded(&self, job: &Job, stats: &mut WorkerStats) -> ScanResult {
        match AssertUnwindSafe(self.scanner.scan(job)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                stats.panics += 1;
                let error = ScanError::Panicked {
                    key: job.key(),
                    reason: panic_message(panic.as_ref()),
                };
                error!(kind = error.kind(), worker_id = self.id, "{error}");
                ScanResult::empty()
            }
        }
    }

    /// Apply a lifecycle event; an invalid transition is logged and falls
    /// back to the terminal state implied by the event
    fn advance(&self, key: &str, state: JobState, event: JobEvent) -> JobState {
        state
            .transition(event, &self.retry_policy)
            .unwrap_or_else(|e| {
                log_error("worker", event.event_type(), &e.to_string(), Some(key));
                match event {
                    JobEvent::Claim => JobState::InFlight,
                    JobEvent::Succeed => JobState::Succeeded,
                    JobEvent::Fail { .. } => JobState::PermanentlyFailed,
                }
            })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingScanner {
        calls: AtomicUsize,
        succeed_on: Option<usize>,
    }

    #[async_trait]
    impl Scanner for CountingScanner {
        async fn scan(&self, job: &Job) -> ScanResult {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            match self.succeed_on {
                Some(n) if call >= n => [("stars".to_string(), Value::from(job.repository().stars))]
                    .into_iter()
                    .collect(),
                _ => ScanResult::empty(),
            }
        }
    }

    struct PanickingScanner;

    #[async_trait]
    impl Scanner for PanickingScanner {
        async fn scan(&self, _job: &Job) -> ScanResult {
            panic!("scanner exploded");
        }
    }

    fn pool_config(workers: usize) -> PoolConfig {
        PoolConfig {
            workers,
            termination: TerminationPolicy::Drain,
            idle_backoff_ms: 5,
        }
    }

    fn repo() -> Repository {
        Repository::new("alice", "foo", "https://github.com/alice/foo", 7)
    }

    #[tokio::test]
    async fn test_third_attempt_success() {
        let scanner = Arc::new(CountingScanner {
            calls: AtomicUsize::new(0),
            succeed_on: Some(3),
        });
        let pool = WorkerPool::new(pool_config(1), scanner.clone());
        let run = pool.run_with_stats(vec![repo()]).await;

        assert_eq!(scanner.calls.load(Ordering::SeqCst), 3);
        assert!(run.report.results.contains_key("alice:foo"));
        assert!(run.report.failed.is_empty());
        assert_eq!(run.workers[0].requeued, 2);
        assert_eq!(run.workers[0].succeeded, 1);
    }

    #[tokio::test]
    async fn test_panics_count_as_failed_attempts() {
        let pool = WorkerPool::new(pool_config(2), Arc::new(PanickingScanner));
        let run = pool.run_with_stats(vec![repo()]).await;

        assert_eq!(run.report.failed, vec!["alice:foo"]);
        assert!(run.report.results.is_empty());
        let panics: usize = run.workers.iter().map(|w| w.panics).sum();
        assert_eq!(panics, 3);
    }

    #[tokio::test]
    async fn test_empty_input_finishes_immediately() {
        let scanner = Arc::new(CountingScanner {
            calls: AtomicUsize::new(0),
            succeed_on: Some(1),
        });
        let pool = WorkerPool::new(pool_config(4), scanner);
        let run = pool.run_with_stats(Vec::new()).await;

        assert_eq!(run.report, CrawlReport::default());
        assert_eq!(run.workers.len(), 4);
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(boxed.as_ref()), "static message");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic payload");
    }
}
