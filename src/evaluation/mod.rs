//! # Evaluation
//!
//! Compares code quality between a group of "usual" repositories and a group
//! of "popular" ones using crawl result files: descriptive statistics per
//! group, a two-sided Mann-Whitney U test per metric, and a trend of each
//! metric against log-scaled star counts across both groups.

pub mod dataset;
pub mod statistics;

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub use dataset::{load_file, load_group, Observation};
pub use statistics::{describe, log_trend, mann_whitney_u, LogTrend, MannWhitney, Summary, TrendPoint};

/// Default number of sampled points along each trend line
pub const DEFAULT_TREND_POINTS: usize = 200;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Error loading file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("File {path} does not contain a repository object")]
    NotAnObject { path: String },

    #[error("The {group} group has no usable records")]
    EmptyGroup { group: &'static str },
}

/// Per-group descriptive statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub count: usize,
    pub smells: Summary,
    pub complexity: Summary,
}

/// A value computed separately for both quality metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPair<T> {
    pub smells: T,
    pub complexity: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub usual: GroupSummary,
    pub popular: GroupSummary,
    pub mann_whitney: MetricPair<MannWhitney>,
    /// `None` per metric when the star counts do not spread enough to fit
    pub trends: MetricPair<Option<LogTrend>>,
}

/// Loaded usual/popular groups ready for evaluation
#[derive(Debug, Clone)]
pub struct Evaluator {
    usual: Vec<Observation>,
    popular: Vec<Observation>,
    trend_points: usize,
}

impl Evaluator {
    /// Load both groups from result files
    pub fn load<P: AsRef<Path>>(usual_files: &[P], popular_files: &[P]) -> Self {
        let usual = load_group(usual_files);
        let popular = load_group(popular_files);
        info!(
            usual = usual.len(),
            popular = popular.len(),
            "Loaded evaluation data"
        );
        Self::from_observations(usual, popular)
    }

    pub fn from_observations(usual: Vec<Observation>, popular: Vec<Observation>) -> Self {
        Self {
            usual,
            popular,
            trend_points: DEFAULT_TREND_POINTS,
        }
    }

    pub fn with_trend_points(mut self, trend_points: usize) -> Self {
        self.trend_points = trend_points;
        self
    }

    pub fn usual(&self) -> &[Observation] {
        &self.usual
    }

    pub fn popular(&self) -> &[Observation] {
        &self.popular
    }

    pub fn evaluate(&self) -> Result<EvaluationReport, EvaluationError> {
        let usual = summarize("usual", &self.usual)?;
        let popular = summarize("popular", &self.popular)?;

        let (usual_smells, usual_complexity) = columns(&self.usual);
        let (popular_smells, popular_complexity) = columns(&self.popular);

        let mann_whitney = MetricPair {
            smells: mann_whitney_u(&usual_smells, &popular_smells)
                .ok_or(EvaluationError::EmptyGroup { group: "usual" })?,
            complexity: mann_whitney_u(&usual_complexity, &popular_complexity)
                .ok_or(EvaluationError::EmptyGroup { group: "usual" })?,
        };

        let combined: Vec<&Observation> = self.usual.iter().chain(&self.popular).collect();
        let stars: Vec<f64> = combined.iter().map(|o| o.stars).collect();
        let smells: Vec<f64> = combined.iter().map(|o| o.smells).collect();
        let complexity: Vec<f64> = combined.iter().map(|o| o.complexity).collect();

        let trends = MetricPair {
            smells: log_trend(&stars, &smells, self.trend_points),
            complexity: log_trend(&stars, &complexity, self.trend_points),
        };

        Ok(EvaluationReport {
            usual,
            popular,
            mann_whitney,
            trends,
        })
    }
}

fn columns(observations: &[Observation]) -> (Vec<f64>, Vec<f64>) {
    observations.iter().map(|o| (o.smells, o.complexity)).unzip()
}

fn summarize(group: &'static str, observations: &[Observation]) -> Result<GroupSummary, EvaluationError> {
    let (smells, complexity) = columns(observations);
    match (describe(&smells), describe(&complexity)) {
        (Some(smells), Some(complexity)) => Ok(GroupSummary {
            count: observations.len(),
            smells,
            complexity,
        }),
        _ => Err(EvaluationError::EmptyGroup { group }),
    }
}
