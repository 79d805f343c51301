//! Shared fixtures for integration tests: repository builders and scripted
//! scanners that count calls per key.
#![allow(dead_code)]

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use smell_of_stars::config::{PoolConfig, TerminationPolicy};
use smell_of_stars::models::{Job, Repository, ScanResult};
use smell_of_stars::scanning::Scanner;

pub fn repository(owner: &str, name: &str, stars: u64) -> Repository {
    Repository::new(owner, name, format!("https://github.com/{owner}/{name}"), stars)
}

pub fn repositories(count: usize) -> Vec<Repository> {
    (0..count)
        .map(|i| repository("owner", &format!("repo{i}"), i as u64))
        .collect()
}

pub fn pool_config(workers: usize, termination: TerminationPolicy) -> PoolConfig {
    PoolConfig {
        workers,
        termination,
        idle_backoff_ms: 2,
    }
}

/// A non-empty result shaped like a real scan
pub fn success_result(repository: &Repository) -> ScanResult {
    ScanResult::from_measures(
        [
            ("ncloc".to_string(), "100".to_string()),
            ("code_smells".to_string(), "4".to_string()),
            ("cognitive_complexity".to_string(), "12".to_string()),
        ]
        .into_iter()
        .collect(),
        repository.stars,
    )
}

/// How a scripted scanner answers a given key
#[derive(Debug, Clone, Copy)]
pub enum Script {
    AlwaysSucceed,
    AlwaysFail,
    /// Fail this many times, then succeed
    FailThenSucceed(u32),
}

/// Scanner whose outcome per key is scripted; records every call and the
/// attempt number each job carried
pub struct ScriptedScanner {
    scripts: HashMap<String, Script>,
    default_script: Script,
    delay: Duration,
    calls: DashMap<String, u32>,
    attempts_seen: DashMap<String, Vec<u32>>,
}

impl ScriptedScanner {
    pub fn new(default_script: Script) -> Self {
        Self {
            scripts: HashMap::new(),
            default_script,
            delay: Duration::ZERO,
            calls: DashMap::new(),
            attempts_seen: DashMap::new(),
        }
    }

    pub fn with_script(mut self, key: &str, script: Script) -> Self {
        self.scripts.insert(key.to_string(), script);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls_for(&self, key: &str) -> u32 {
        self.calls.get(key).map(|c| *c).unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }

    pub fn attempts_for(&self, key: &str) -> Vec<u32> {
        self.attempts_seen
            .get(key)
            .map(|a| a.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Scanner for ScriptedScanner {
    async fn scan(&self, job: &Job) -> ScanResult {
        let key = job.key();
        let call = {
            let mut entry = self.calls.entry(key.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        self.attempts_seen
            .entry(key.clone())
            .or_default()
            .push(job.current_attempt());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let script = self
            .scripts
            .get(&key)
            .copied()
            .unwrap_or(self.default_script);
        let succeed = match script {
            Script::AlwaysSucceed => true,
            Script::AlwaysFail => false,
            Script::FailThenSucceed(failures) => call > failures,
        };

        if succeed {
            success_result(job.repository())
        } else {
            ScanResult::empty()
        }
    }
}

/// Scanner that returns a distinct value per call so overwrites are observable
pub struct SequenceScanner {
    counter: std::sync::atomic::AtomicU64,
}

impl SequenceScanner {
    pub fn new() -> Self {
        Self {
            counter: std::sync::atomic::AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Scanner for SequenceScanner {
    async fn scan(&self, _job: &Job) -> ScanResult {
        let n = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        [("sequence".to_string(), Value::from(n))]
            .into_iter()
            .collect()
    }
}

/// Succeeding scanner that records how many scans of each key overlap
pub struct OverlapTrackingScanner {
    delay: Duration,
    running: DashMap<String, u32>,
    peak: DashMap<String, u32>,
    calls: DashMap<String, u32>,
}

impl OverlapTrackingScanner {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            running: DashMap::new(),
            peak: DashMap::new(),
            calls: DashMap::new(),
        }
    }

    pub fn peak_for(&self, key: &str) -> u32 {
        self.peak.get(key).map(|p| *p).unwrap_or(0)
    }

    pub fn calls_for(&self, key: &str) -> u32 {
        self.calls.get(key).map(|c| *c).unwrap_or(0)
    }
}

#[async_trait]
impl Scanner for OverlapTrackingScanner {
    async fn scan(&self, job: &Job) -> ScanResult {
        let key = job.key();
        *self.calls.entry(key.clone()).or_insert(0) += 1;
        let running = {
            let mut entry = self.running.entry(key.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        {
            let mut peak = self.peak.entry(key.clone()).or_insert(0);
            *peak = (*peak).max(running);
        }

        tokio::time::sleep(self.delay).await;

        if let Some(mut entry) = self.running.get_mut(&key) {
            *entry -= 1;
        }
        success_result(job.repository())
    }
}
