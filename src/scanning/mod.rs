//! # Scanning
//!
//! Drives one job through the external analysis lifecycle: acquire sources,
//! trigger the analyzer, poll for measures, normalize, release resources.
//!
//! Every failure inside the lifecycle has a named [`ScanError`] kind for
//! logging, but none of them crosses the [`Scanner`] boundary: callers only
//! ever see a non-empty [`ScanResult`] (success) or the empty sentinel.

pub mod acquisition;
pub mod engine;
pub mod sonar;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Job, ScanResult};

pub use acquisition::{release_path, GitAcquirer, SourceAcquisition};
pub use engine::{PollSettings, ScanEngine};
pub use sonar::{AnalysisService, SonarClient};

/// Named failure kinds inside the scan lifecycle
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to acquire sources for {key}: {reason}")]
    Acquisition { key: String, reason: String },

    #[error("Analysis run failed for {key}: {reason}")]
    AnalysisTrigger { key: String, reason: String },

    #[error("Measure poll failed for {key}: {reason}")]
    Poll { key: String, reason: String },

    #[error("No measures for {key} after {waited_ms}ms of polling")]
    PollTimeout { key: String, waited_ms: u128 },

    #[error("Failed to remove working copy {path}: {reason}")]
    LocalCleanup { path: String, reason: String },

    #[error("Failed to delete analysis project {key}: {reason}")]
    RemoteCleanup { key: String, reason: String },

    #[error("Scan of {key} panicked: {reason}")]
    Panicked { key: String, reason: String },
}

impl ScanError {
    /// Short kind label for structured log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Acquisition { .. } => "acquisition",
            Self::AnalysisTrigger { .. } => "analysis_trigger",
            Self::Poll { .. } => "poll",
            Self::PollTimeout { .. } => "poll_timeout",
            Self::LocalCleanup { .. } => "local_cleanup",
            Self::RemoteCleanup { .. } => "remote_cleanup",
            Self::Panicked { .. } => "panicked",
        }
    }
}

/// Anything that can turn a job into a scan result.
///
/// Implementations must not fail: every error becomes the empty sentinel.
#[async_trait]
pub trait Scanner: Send + Sync {
    async fn scan(&self, job: &Job) -> ScanResult;
}
