//! # Crawler Configuration System
//!
//! Explicit configuration structs handed to every client and to the worker
//! pool at construction time. Nothing reads credentials from process-wide
//! state after loading.
//!
//! ## Layering (lowest to highest precedence)
//!
//! 1. Built-in defaults ([`CrawlerConfig::default`])
//! 2. Optional TOML file (default `config/crawler.toml`)
//! 3. `CRAWLER_<SECTION>__<FIELD>` environment variables
//! 4. Legacy variables: `GITHUB_TOKEN`, `SONARQUBE_URL`, `SONARQUBE_TOKEN`,
//!    `WORKING_THREADS`, `LOG_LEVEL`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use smell_of_stars::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load(None)?;
//! let workers = manager.config().pool.workers;
//! let poll_interval = manager.config().scan.poll_interval();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_MAX_WAIT, DEFAULT_WORKERS};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/crawler.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Repository discovery (GitHub search API)
    pub github: GitHubConfig,

    /// Analysis service (SonarQube server and scanner CLI)
    pub sonar: SonarConfig,

    /// Source acquisition and polling behavior
    pub scan: ScanConfig,

    /// Worker pool sizing and termination
    pub pool: PoolConfig,

    /// Log verbosity and file output
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_url: String,
    pub token: Option<String>,
    /// Results per search page (the search API caps this at 100)
    pub page_size: u32,
    pub timeout_ms: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token: None,
            page_size: 100,
            timeout_ms: 30_000,
        }
    }
}

impl GitHubConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SonarConfig {
    pub url: String,
    pub token: Option<String>,
    /// Scanner executable invoked per repository
    pub scanner_binary: String,
    pub timeout_ms: u64,
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9000".to_string(),
            token: None,
            scanner_binary: "sonar-scanner".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl SonarConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Base directory for key-derived working copies
    pub repos_dir: PathBuf,
    pub git_binary: String,
    pub poll_interval_ms: u64,
    pub poll_max_wait_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            repos_dir: PathBuf::from("out/repos"),
            git_binary: "git".to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            poll_max_wait_ms: DEFAULT_POLL_MAX_WAIT.as_millis() as u64,
        }
    }
}

impl ScanConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_max_wait(&self) -> Duration {
        Duration::from_millis(self.poll_max_wait_ms)
    }
}

/// When a worker may stop pulling from the queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationPolicy {
    /// Exit only once the queue is empty and no job is outstanding anywhere
    #[default]
    Drain,
    /// Exit on the first empty dequeue, even if a sibling may still requeue
    Eager,
}

impl std::fmt::Display for TerminationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Drain => write!(f, "drain"),
            Self::Eager => write!(f, "eager"),
        }
    }
}

impl std::str::FromStr for TerminationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drain" => Ok(Self::Drain),
            "eager" => Ok(Self::Eager),
            _ => Err(format!("Invalid termination policy: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    pub workers: usize,
    pub termination: TerminationPolicy,
    /// Sleep between re-checks while draining and the queue is transiently empty
    pub idle_backoff_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            termination: TerminationPolicy::default(),
            idle_backoff_ms: 250,
        }
    }
}

impl PoolConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 0 = warnings and errors, 1 = info, 2+ = debug
    pub level: u8,
    pub log_dir: PathBuf,
    pub file_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: 1,
            log_dir: PathBuf::from("log"),
            file_output: true,
        }
    }
}

impl CrawlerConfig {
    /// Validate the merged configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.pool.workers == 0 {
            return Err(ConfigurationError::invalid_value(
                "pool.workers",
                "0",
                "worker count must be greater than 0",
            ));
        }

        if self.scan.poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "scan.poll_interval_ms",
                "0",
                "poll interval must be greater than 0",
            ));
        }

        if self.scan.poll_max_wait_ms < self.scan.poll_interval_ms {
            return Err(ConfigurationError::invalid_value(
                "scan.poll_max_wait_ms",
                self.scan.poll_max_wait_ms.to_string(),
                "maximum poll wait must be at least one poll interval",
            ));
        }

        if self.sonar.url.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "sonar.url",
                "analysis service configuration",
            ));
        }

        if self.github.api_url.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "github.api_url",
                "discovery configuration",
            ));
        }

        if !(1..=100).contains(&self.github.page_size) {
            return Err(ConfigurationError::invalid_value(
                "github.page_size",
                self.github.page_size.to_string(),
                "page size must be between 1 and 100",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CrawlerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pool.workers, 4);
        assert_eq!(config.pool.termination, TerminationPolicy::Drain);
        assert_eq!(config.scan.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.scan.poll_max_wait(), Duration::from_secs(120));
    }

    #[test]
    fn test_validation_rejects_zero_workers() {
        let mut config = CrawlerConfig::default();
        config.pool.workers = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { ref field, .. }) if field == "pool.workers"
        ));
    }

    #[test]
    fn test_validation_rejects_short_max_wait() {
        let mut config = CrawlerConfig::default();
        config.scan.poll_interval_ms = 1_000;
        config.scan.poll_max_wait_ms = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_oversized_pages() {
        let mut config = CrawlerConfig::default();
        config.github.page_size = 200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_termination_policy_parsing() {
        assert_eq!("drain".parse::<TerminationPolicy>(), Ok(TerminationPolicy::Drain));
        assert_eq!("EAGER".parse::<TerminationPolicy>(), Ok(TerminationPolicy::Eager));
        assert!("lazy".parse::<TerminationPolicy>().is_err());
    }
}
