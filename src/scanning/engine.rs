//! # Scan Engine
//!
//! Runs the per-repository lifecycle strictly in order:
//!
//! 1. acquire sources at the key-derived checkout path
//! 2. trigger the analyzer
//! 3. poll for measures until non-empty or the wait budget is spent
//! 4. normalize the measures into a [`ScanResult`]
//! 5. release the working copy and the remote project
//!
//! Release runs after polling on every path that got past acquisition, so a
//! failed poll never leaves a checkout or a remote project behind.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::acquisition::{GitAcquirer, SourceAcquisition};
use super::sonar::{AnalysisService, SonarClient};
use super::{ScanError, Scanner};
use crate::config::{ConfigResult, CrawlerConfig, ScanConfig};
use crate::constants::{metrics, MIN_POLL_INTERVAL};
use crate::models::{Job, ScanResult};

/// Polling cadence for the measures endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    interval: Duration,
    max_wait: Duration,
}

impl PollSettings {
    /// The interval is raised to [`MIN_POLL_INTERVAL`] so polling always ends
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            max_wait,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }
}

impl From<&ScanConfig> for PollSettings {
    fn from(config: &ScanConfig) -> Self {
        Self::new(config.poll_interval(), config.poll_max_wait())
    }
}

/// Scanner implementation backed by source acquisition and an analysis service
pub struct ScanEngine {
    acquisition: Arc<dyn SourceAcquisition>,
    analysis: Arc<dyn AnalysisService>,
    repos_dir: PathBuf,
    poll: PollSettings,
}

impl std::fmt::Debug for ScanEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanEngine")
            .field("repos_dir", &self.repos_dir)
            .field("poll", &self.poll)
            .finish()
    }
}

impl ScanEngine {
    pub fn new(
        acquisition: Arc<dyn SourceAcquisition>,
        analysis: Arc<dyn AnalysisService>,
        repos_dir: impl Into<PathBuf>,
        poll: PollSettings,
    ) -> Self {
        Self {
            acquisition,
            analysis,
            repos_dir: repos_dir.into(),
            poll,
        }
    }

    /// Wire up `git` acquisition and the SonarQube client from configuration
    pub fn from_config(config: &CrawlerConfig) -> ConfigResult<Self> {
        let analysis = SonarClient::new(&config.sonar)?;
        Ok(Self::new(
            Arc::new(GitAcquirer::new(config.scan.git_binary.clone())),
            Arc::new(analysis),
            config.scan.repos_dir.clone(),
            PollSettings::from(&config.scan),
        ))
    }

    pub fn repos_dir(&self) -> &Path {
        &self.repos_dir
    }

    /// Poll until the service returns measures or `max_wait` has elapsed.
    ///
    /// A transport or server error on one tick counts as "not ready yet".
    async fn wait_for_measures(
        &self,
        project_key: &str,
    ) -> Result<BTreeMap<String, String>, ScanError> {
        let mut waited = Duration::ZERO;

        while waited < self.poll.max_wait {
            match self
                .analysis
                .poll_measures(project_key, &metrics::REQUESTED)
                .await
            {
                Ok(measures) if !measures.is_empty() => {
                    debug!(
                        project_key = %project_key,
                        waited_ms = waited.as_millis() as u64,
                        metric_count = measures.len(),
                        "Measures available"
                    );
                    return Ok(measures);
                }
                Ok(_) => {}
                Err(e) => debug!(project_key = %project_key, error = %e, "Poll tick failed"),
            }

            tokio::time::sleep(self.poll.interval).await;
            waited += self.poll.interval;
        }

        Err(ScanError::PollTimeout {
            key: project_key.to_string(),
            waited_ms: waited.as_millis(),
        })
    }

    async fn release_local(&self, path: &Path) {
        if let Err(e) = self.acquisition.release(path).await {
            report(&ScanError::LocalCleanup {
                path: path.display().to_string(),
                reason: e.to_string(),
            });
        }
    }

    async fn release_remote(&self, project_key: &str) {
        if let Err(e) = self.analysis.delete_project(project_key).await {
            report(&e);
        }
    }
}

fn report(error: &ScanError) {
    match error {
        ScanError::Poll { .. } => debug!(kind = error.kind(), "{error}"),
        ScanError::LocalCleanup { .. } | ScanError::RemoteCleanup { .. } => {
            warn!(kind = error.kind(), "{error}")
        }
        _ => error!(kind = error.kind(), "{error}"),
    }
}

#[async_trait]
impl Scanner for ScanEngine {
    async fn scan(&self, job: &Job) -> ScanResult {
        let repository = job.repository();
        let key = repository.key();
        let checkout = repository.checkout_path(&self.repos_dir);

        info!(
            repository = %key,
            attempt = job.current_attempt(),
            checkout = %checkout.display(),
            "Scanning repository"
        );

        if let Err(e) = self.acquisition.acquire(&repository.url, &checkout).await {
            report(&ScanError::Acquisition {
                key: key.clone(),
                reason: e.to_string(),
            });
            // A partial clone may still be on disk
            self.release_local(&checkout).await;
            return ScanResult::empty();
        }

        // A failed trigger still polls: the service may hold measures from an earlier run
        if let Err(e) = self
            .analysis
            .run_scan(&key, &repository.name, &checkout)
            .await
        {
            report(&e);
        }

        let measures = match self.wait_for_measures(&key).await {
            Ok(measures) => measures,
            Err(e) => {
                report(&e);
                BTreeMap::new()
            }
        };

        let result = ScanResult::from_measures(measures, repository.stars);

        self.release_local(&checkout).await;
        self.release_remote(&key).await;

        debug!(
            repository = %key,
            success = !result.is_empty(),
            "Scan finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Repository;
    use crate::scanning::acquisition::AcquisitionError;
    use parking_lot::Mutex;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Calls(Mutex<Vec<String>>);

    impl Calls {
        fn push(&self, call: impl Into<String>) {
            self.0.lock().push(call.into());
        }

        fn list(&self) -> Vec<String> {
            self.0.lock().clone()
        }
    }

    struct FakeAcquirer {
        calls: Arc<Calls>,
        fail: bool,
    }

    #[async_trait]
    impl SourceAcquisition for FakeAcquirer {
        async fn acquire(&self, _url: &str, destination: &Path) -> Result<(), AcquisitionError> {
            self.calls.push(format!(
                "acquire {}",
                destination.file_name().unwrap().to_string_lossy()
            ));
            if self.fail {
                Err(AcquisitionError::Exit {
                    status: "exit status: 128".to_string(),
                    stderr: "repository not found".to_string(),
                })
            } else {
                Ok(())
            }
        }

        async fn release(&self, _path: &Path) -> io::Result<()> {
            self.calls.push("release_local");
            Ok(())
        }
    }

    struct FakeAnalysis {
        calls: Arc<Calls>,
        /// Number of empty polls before measures appear; `None` never returns any
        ready_after: Option<usize>,
        polls: AtomicUsize,
    }

    #[async_trait]
    impl AnalysisService for FakeAnalysis {
        async fn run_scan(&self, key: &str, _name: &str, _path: &Path) -> Result<(), ScanError> {
            self.calls.push(format!("run_scan {key}"));
            Ok(())
        }

        async fn poll_measures(
            &self,
            _key: &str,
            metric_names: &[&str],
        ) -> Result<BTreeMap<String, String>, ScanError> {
            self.calls.push("poll");
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            match self.ready_after {
                Some(ready) if n >= ready => Ok(metric_names
                    .iter()
                    .map(|m| {
                        let value = match *m {
                            "ncloc" => "200",
                            "code_smells" => "10",
                            _ => "50",
                        };
                        (m.to_string(), value.to_string())
                    })
                    .collect()),
                _ => Ok(BTreeMap::new()),
            }
        }

        async fn delete_project(&self, key: &str) -> Result<(), ScanError> {
            self.calls.push(format!("delete {key}"));
            Ok(())
        }
    }

    fn engine(acquire_fails: bool, ready_after: Option<usize>) -> (ScanEngine, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let engine = ScanEngine::new(
            Arc::new(FakeAcquirer {
                calls: calls.clone(),
                fail: acquire_fails,
            }),
            Arc::new(FakeAnalysis {
                calls: calls.clone(),
                ready_after,
                polls: AtomicUsize::new(0),
            }),
            "/tmp/repos",
            PollSettings::new(Duration::from_millis(5), Duration::from_millis(20)),
        );
        (engine, calls)
    }

    fn job() -> Job {
        Job::new(Repository::new("alice", "foo", "https://github.com/alice/foo", 42))
    }

    #[tokio::test]
    async fn test_successful_scan_runs_steps_in_order() {
        let (engine, calls) = engine(false, Some(1));
        let result = engine.scan(&job()).await;

        assert!(!result.is_empty());
        assert_eq!(result.metric_f64("stars"), Some(42.0));
        assert_eq!(result.metric_f64("norm_code_smells"), Some(0.05));
        assert_eq!(result.metric_f64("norm_cognitive_complexity"), Some(0.25));
        assert_eq!(
            calls.list(),
            vec![
                "acquire alice-foo",
                "run_scan alice:foo",
                "poll",
                "poll",
                "release_local",
                "delete alice:foo",
            ]
        );
    }

    #[tokio::test]
    async fn test_poll_timeout_still_releases_resources() {
        let (engine, calls) = engine(false, None);
        let result = engine.scan(&job()).await;

        assert!(result.is_empty());
        let calls = calls.list();
        // 20ms budget at 5ms intervals
        assert_eq!(calls.iter().filter(|c| *c == "poll").count(), 4);
        assert_eq!(
            &calls[calls.len() - 2..],
            &["release_local".to_string(), "delete alice:foo".to_string()]
        );
    }

    #[tokio::test]
    async fn test_acquisition_failure_skips_analysis() {
        let (engine, calls) = engine(true, Some(0));
        let result = engine.scan(&job()).await;

        assert!(result.is_empty());
        assert_eq!(calls.list(), vec!["acquire alice-foo", "release_local"]);
    }

    #[test]
    fn test_poll_settings_from_config() {
        let settings = PollSettings::from(&ScanConfig::default());
        assert_eq!(settings.interval, Duration::from_secs(5));
        assert_eq!(settings.max_wait, Duration::from_secs(120));
    }

    #[test]
    fn test_zero_poll_interval_is_raised() {
        let settings = PollSettings::new(Duration::ZERO, Duration::from_millis(3));
        assert_eq!(settings.interval(), MIN_POLL_INTERVAL);
        assert_eq!(settings.max_wait(), Duration::from_millis(3));
    }

    #[tokio::test]
    async fn test_zero_poll_interval_still_times_out() {
        let calls = Arc::new(Calls::default());
        let engine = ScanEngine::new(
            Arc::new(FakeAcquirer {
                calls: calls.clone(),
                fail: false,
            }),
            Arc::new(FakeAnalysis {
                calls: calls.clone(),
                ready_after: None,
                polls: AtomicUsize::new(0),
            }),
            "/tmp/repos",
            PollSettings::new(Duration::ZERO, Duration::from_millis(3)),
        );

        let result = tokio::time::timeout(Duration::from_secs(5), engine.scan(&job()))
            .await
            .expect("polling must stop once the wait budget is spent");
        assert!(result.is_empty());
        let polls = calls.list().iter().filter(|c| *c == "poll").count();
        assert_eq!(polls, 3);
    }
}
