//! # SonarQube Analysis Service Client
//!
//! Triggers `sonar-scanner` against a local working copy and talks to the
//! SonarQube web API to fetch measures and delete projects. All calls are
//! keyed by the repository's `owner:name` project key.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::ScanError;
use crate::config::{ConfigResult, ConfigurationError, SonarConfig};
use crate::constants::source_exclusions;

/// Black-box static-analysis service
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Run the analyzer over `source_path`, publishing under `project_key`
    async fn run_scan(
        &self,
        project_key: &str,
        project_name: &str,
        source_path: &Path,
    ) -> Result<(), ScanError>;

    /// One measures query; an empty map means "not available yet"
    async fn poll_measures(
        &self,
        project_key: &str,
        metric_names: &[&str],
    ) -> Result<BTreeMap<String, String>, ScanError>;

    /// Remove the project record from the service
    async fn delete_project(&self, project_key: &str) -> Result<(), ScanError>;
}

#[derive(Debug, Default, Deserialize)]
struct MeasuresResponse {
    #[serde(default)]
    component: Option<ComponentMeasures>,
}

#[derive(Debug, Default, Deserialize)]
struct ComponentMeasures {
    #[serde(default)]
    measures: Vec<Measure>,
}

#[derive(Debug, Deserialize)]
struct Measure {
    metric: String,
    #[serde(default)]
    value: Option<String>,
}

/// HTTP + CLI client for a SonarQube server
#[derive(Clone)]
pub struct SonarClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    scanner_binary: String,
}

impl std::fmt::Debug for SonarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonarClient")
            .field("base_url", &self.base_url)
            .field("auth_enabled", &self.token.is_some())
            .field("scanner_binary", &self.scanner_binary)
            .finish()
    }
}

impl SonarClient {
    pub fn new(config: &SonarConfig) -> ConfigResult<Self> {
        url::Url::parse(&config.url).map_err(|e| {
            ConfigurationError::invalid_value("sonar.url", config.url.clone(), e.to_string())
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("smell-of-stars/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ConfigurationError::invalid_value("sonar", "http client", e.to_string())
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            scanner_binary: config.scanner_binary.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            // Token as user name, empty password
            Some(token) => request.basic_auth(token, Some("")),
            None => request,
        }
    }

    fn scanner_args(&self, project_key: &str, project_name: &str, source_path: &Path) -> Vec<String> {
        let sources = source_path.display().to_string();
        let mut args = vec![
            format!("-Dsonar.projectKey={project_key}"),
            format!("-Dsonar.projectName={project_name}"),
            format!("-Dsonar.sources={sources}"),
            format!("-Dsonar.projectBaseDir={sources}"),
            format!("-Dsonar.host.url={}", self.base_url),
            format!("-Dsonar.exclusions={}", source_exclusions()),
        ];
        if let Some(token) = &self.token {
            args.push(format!("-Dsonar.token={token}"));
        }
        args
    }
}

#[async_trait]
impl AnalysisService for SonarClient {
    async fn run_scan(
        &self,
        project_key: &str,
        project_name: &str,
        source_path: &Path,
    ) -> Result<(), ScanError> {
        let trigger_error = |reason: String| ScanError::AnalysisTrigger {
            key: project_key.to_string(),
            reason,
        };

        if !source_path.is_dir() {
            return Err(trigger_error(format!(
                "source path {} does not exist",
                source_path.display()
            )));
        }

        debug!(
            project_key = %project_key,
            exclusions = %source_exclusions(),
            "Running sonar-scanner"
        );

        let output = Command::new(&self.scanner_binary)
            .args(self.scanner_args(project_key, project_name, source_path))
            .current_dir(source_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| trigger_error(format!("failed to spawn {}: {e}", self.scanner_binary)))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last_line = stderr.lines().last().unwrap_or_default().trim().to_string();
            Err(trigger_error(format!("exited with {}: {last_line}", output.status)))
        }
    }

    async fn poll_measures(
        &self,
        project_key: &str,
        metric_names: &[&str],
    ) -> Result<BTreeMap<String, String>, ScanError> {
        let poll_error = |reason: String| ScanError::Poll {
            key: project_key.to_string(),
            reason,
        };

        let request = self
            .client
            .get(self.endpoint("api/measures/component"))
            .query(&[
                ("component", project_key.to_string()),
                ("metricKeys", metric_names.join(",")),
            ]);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| poll_error(e.to_string()))?;

        let status = response.status();
        // The component only exists once the background analysis task has finished
        if status == StatusCode::NOT_FOUND {
            return Ok(BTreeMap::new());
        }
        if !status.is_success() {
            return Err(poll_error(format!("HTTP {status}")));
        }

        let body: MeasuresResponse = response
            .json()
            .await
            .map_err(|e| poll_error(format!("invalid measures response: {e}")))?;

        Ok(body
            .component
            .unwrap_or_default()
            .measures
            .into_iter()
            .map(|m| (m.metric, m.value.unwrap_or_else(|| "0".to_string())))
            .collect())
    }

    async fn delete_project(&self, project_key: &str) -> Result<(), ScanError> {
        debug!(project_key = %project_key, "Deleting SonarQube project");

        let request = self
            .client
            .post(self.endpoint("api/projects/delete"))
            .query(&[("project", project_key)]);
        let response = self.authorize(request).send().await.map_err(|e| {
            ScanError::RemoteCleanup {
                key: project_key.to_string(),
                reason: e.to_string(),
            }
        })?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            status => Err(ScanError::RemoteCleanup {
                key: project_key.to_string(),
                reason: format!("HTTP {status}"),
            }),
        }
    }
}
