//! GitHub search API client

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use super::{DiscoveryError, DiscoveryQuery, RepositoryDiscovery};
use crate::config::{ConfigResult, ConfigurationError, GitHubConfig};
use crate::models::Repository;

/// The search API serves at most this many results per query
const SEARCH_RESULT_LIMIT: usize = 1_000;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    name: String,
    owner: SearchOwner,
    html_url: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
}

#[derive(Debug, Deserialize)]
struct SearchOwner {
    login: String,
}

impl From<SearchItem> for Repository {
    fn from(item: SearchItem) -> Self {
        let repository = Repository::new(item.owner.login, item.name, item.html_url, item.stargazers_count);
        match item.language {
            Some(language) => repository.with_language(language),
            None => repository,
        }
    }
}

/// Paginated repository search, sorted by most recently updated
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: Option<String>,
    page_size: u32,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .field("auth_enabled", &self.token.is_some())
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> ConfigResult<Self> {
        url::Url::parse(&config.api_url).map_err(|e| {
            ConfigurationError::invalid_value("github.api_url", config.api_url.clone(), e.to_string())
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("smell-of-stars/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ConfigurationError::invalid_value("github", "http client", e.to_string())
            })?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            page_size: config.page_size,
        })
    }

    /// Fetch one 1-based page of search results
    pub async fn search_page(
        &self,
        filters: &str,
        page: u32,
    ) -> Result<Vec<Repository>, DiscoveryError> {
        let mut request = self
            .client
            .get(format!("{}/search/repositories", self.api_url))
            .header(header::ACCEPT, "application/vnd.github+json")
            .query(&[
                ("q", filters.to_string()),
                ("sort", "updated".to_string()),
                ("order", "desc".to_string()),
                ("per_page", self.page_size.to_string()),
                ("page", page.to_string()),
            ]);
        if let Some(token) = &self.token {
            request = request.header(header::AUTHORIZATION, format!("token {token}"));
        }

        debug!(filters = %filters, page = page, "Requesting search page");
        let response = request.send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| DiscoveryError::Decode(e.to_string()))?;

        Ok(body.items.into_iter().map(Repository::from).collect())
    }
}

#[async_trait]
impl RepositoryDiscovery for GitHubClient {
    async fn discover(&self, query: &DiscoveryQuery) -> Vec<Repository> {
        let filters = query.compose_filters();
        let wanted = query.count.min(SEARCH_RESULT_LIMIT);
        let mut seen = HashSet::new();
        let mut repositories = Vec::with_capacity(wanted);
        let mut page = 1u32;

        info!(filters = %filters, count = query.count, "🔍 DISCOVERY: Searching repositories");

        while repositories.len() < wanted {
            let items = match self.search_page(&filters, page).await {
                Ok(items) => items,
                Err(e) => {
                    error!(page = page, error = %e, "Search page failed, stopping pagination");
                    break;
                }
            };
            if items.is_empty() {
                break;
            }

            for repository in items {
                if seen.insert(repository.key()) {
                    repositories.push(repository);
                }
            }

            if page as usize * self.page_size as usize >= SEARCH_RESULT_LIMIT {
                warn!(
                    collected = repositories.len(),
                    "Reached the search API result limit"
                );
                break;
            }
            page += 1;
        }

        repositories.truncate(query.count);
        info!(found = repositories.len(), "🔍 DISCOVERY: Complete");
        repositories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_conversion() {
        let item: SearchItem = serde_json::from_value(serde_json::json!({
            "name": "foo",
            "owner": {"login": "alice"},
            "html_url": "https://github.com/alice/foo",
            "language": "Python",
            "stargazers_count": 17
        }))
        .unwrap();
        let repository = Repository::from(item);

        assert_eq!(repository.key(), "alice:foo");
        assert_eq!(repository.stars, 17);
        assert_eq!(repository.language.as_deref(), Some("Python"));
    }

    #[test]
    fn test_rejects_invalid_api_url() {
        let config = GitHubConfig {
            api_url: "::nope".to_string(),
            ..GitHubConfig::default()
        };
        assert!(GitHubClient::new(&config).is_err());
    }
}
