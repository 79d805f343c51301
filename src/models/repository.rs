use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A public code repository selected for analysis
///
/// Immutable once discovered. Identity is the `owner:name` key, which is used
/// as the result-map key, the analysis-service project key, and (with `:`
/// replaced) the local checkout directory name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: String,
    pub url: String,
    pub language: Option<String>,
    pub stars: u64,
}

impl Repository {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        stars: u64,
    ) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            url: url.into(),
            language: None,
            stars,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// `owner:name` identity key
    pub fn key(&self) -> String {
        format!("{}:{}", self.owner, self.name)
    }

    /// Filesystem-safe directory name derived from the key
    pub fn checkout_dir_name(&self) -> String {
        self.key().replace(':', "-")
    }

    /// Deterministic working-copy location under `base_dir`
    pub fn checkout_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(self.checkout_dir_name())
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner, self.name)
    }
}
