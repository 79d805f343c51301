//! # Repository Discovery
//!
//! Produces the candidate repository list for a crawl. Page-level failures
//! stay inside this module: they are logged and end pagination, and the
//! caller receives whatever was collected before the failure.

pub mod github;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Repository;

pub use github::GitHubClient;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid search response: {0}")]
    Decode(String),
}

/// Search filters plus the number of repositories wanted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryQuery {
    pub language: Option<String>,
    pub min_stars: Option<u64>,
    pub max_stars: Option<u64>,
    pub count: usize,
}

impl DiscoveryQuery {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into()).filter(|l: &String| !l.is_empty());
        self
    }

    pub fn with_stars(mut self, min_stars: Option<u64>, max_stars: Option<u64>) -> Self {
        self.min_stars = min_stars;
        self.max_stars = max_stars;
        self
    }

    /// Search qualifier string, e.g. `stars:10..500 language:Python`
    pub fn compose_filters(&self) -> String {
        let mut filters = Vec::new();

        match (self.min_stars, self.max_stars) {
            (Some(min), Some(max)) => filters.push(format!("stars:{min}..{max}")),
            (Some(min), None) => filters.push(format!("stars:>={min}")),
            (None, Some(max)) => filters.push(format!("stars:<={max}")),
            (None, None) => {}
        }

        if let Some(language) = &self.language {
            filters.push(format!("language:{language}"));
        }

        if filters.is_empty() {
            "stars:>=0".to_string()
        } else {
            filters.join(" ")
        }
    }
}

/// Source of repositories to crawl
#[async_trait]
pub trait RepositoryDiscovery: Send + Sync {
    /// Up to `query.count` distinct repositories, in discovery order
    async fn discover(&self, query: &DiscoveryQuery) -> Vec<Repository>;
}
