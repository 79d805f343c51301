use thiserror::Error;

use crate::config::ConfigurationError;
use crate::evaluation::EvaluationError;

/// Process-level failures. Repository-level scan failures never surface here;
/// they are downgraded to the empty-result sentinel inside the scan engine.
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Failed to write results to {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize results: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CrawlerError {
    pub fn output(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CrawlerError>;
