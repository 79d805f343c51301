//! Configuration Loader
//!
//! Layers built-in defaults, an optional TOML file and environment variables
//! through the `config` crate, then applies the legacy single-variable
//! overrides the crawler has always honored.

use super::error::{ConfigResult, ConfigurationError};
use super::CrawlerConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default config file location, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config/crawler.toml";

/// Prefix for structured environment overrides, e.g. `CRAWLER_POOL__WORKERS=8`
pub const ENV_PREFIX: &str = "CRAWLER";

/// Loaded, validated configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: CrawlerConfig,
    config_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration from `path` (or the default file) and the process environment
    pub fn load(path: Option<&Path>) -> ConfigResult<ConfigManager> {
        let env_vars: HashMap<String, String> = std::env::vars().collect();
        Self::load_from_sources(path, env_vars)
    }

    /// Load configuration with an explicit environment map
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_sources(
        path: Option<&Path>,
        env_vars: HashMap<String, String>,
    ) -> ConfigResult<ConfigManager> {
        let config_file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        // An explicitly named file must exist; the default one is optional
        let required = path.is_some();
        debug!(
            config_file = %config_file.display(),
            required = required,
            "Loading crawler configuration"
        );

        let structured_env: HashMap<String, String> = env_vars
            .iter()
            .filter(|(key, _)| key.starts_with(&format!("{ENV_PREFIX}_")))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let layered = config::Config::builder()
            .add_source(config::File::from(config_file.as_path()).required(required))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(structured_env)),
            )
            .build()?;

        let mut config: CrawlerConfig = layered.try_deserialize()?;
        Self::apply_legacy_env_overrides(&mut config, &env_vars)?;

        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&Self::sanitize_config_for_logging(&config))
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        let config_file = config_file.exists().then_some(config_file);
        Ok(ConfigManager {
            config,
            config_file,
        })
    }

    /// Wrap an already-built configuration (validated)
    pub fn from_config(config: CrawlerConfig) -> ConfigResult<ConfigManager> {
        config.validate()?;
        Ok(ConfigManager {
            config,
            config_file: None,
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Mutable access for command-line overrides; call [`CrawlerConfig::validate`] afterwards
    pub fn config_mut(&mut self) -> &mut CrawlerConfig {
        &mut self.config
    }

    pub fn into_config(self) -> CrawlerConfig {
        self.config
    }

    /// The file that contributed to this configuration, if any
    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// Configuration as JSON with credentials masked
    pub fn debug_config(&self) -> serde_json::Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    fn apply_legacy_env_overrides(
        config: &mut CrawlerConfig,
        env_vars: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        let non_empty = |key: &str| {
            env_vars
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(token) = non_empty("GITHUB_TOKEN") {
            config.github.token = Some(token);
        }
        if let Some(url) = non_empty("SONARQUBE_URL") {
            config.sonar.url = url;
        }
        if let Some(token) = non_empty("SONARQUBE_TOKEN") {
            config.sonar.token = Some(token);
        }
        if let Some(threads) = non_empty("WORKING_THREADS") {
            config.pool.workers = threads.parse().map_err(|e| {
                ConfigurationError::environment_override("WORKING_THREADS", format!("{e}"))
            })?;
        }
        if let Some(level) = non_empty("LOG_LEVEL") {
            config.logging.level = level.parse().map_err(|e| {
                ConfigurationError::environment_override("LOG_LEVEL", format!("{e}"))
            })?;
        }

        Ok(())
    }

    /// Sanitize configuration for safe logging by masking sensitive fields
    fn sanitize_config_for_logging(config: &CrawlerConfig) -> serde_json::Value {
        let mut config_json = serde_json::json!(config);
        let sensitive_patterns = ["password", "secret", "token", "credential", "auth"];
        Self::sanitize_json_recursive(&mut config_json, &sensitive_patterns);
        config_json
    }

    fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let is_sensitive = sensitive_patterns
                        .iter()
                        .any(|pattern| key_lower.contains(pattern));

                    if is_sensitive {
                        *val = match val {
                            serde_json::Value::Null => serde_json::Value::Null,
                            serde_json::Value::String(s) if s.is_empty() => {
                                serde_json::Value::String("[EMPTY]".to_string())
                            }
                            _ => serde_json::Value::String("[MASKED]".to_string()),
                        };
                    } else {
                        Self::sanitize_json_recursive(val, sensitive_patterns);
                    }
                }
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    Self::sanitize_json_recursive(item, sensitive_patterns);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerminationPolicy;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_default_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::load_from_sources(
            Some(&dir.path().join("absent.toml")),
            HashMap::new(),
        );
        // An explicitly requested file is required
        assert!(manager.is_err());

        let manager = ConfigManager::load_from_sources(None, HashMap::new()).unwrap();
        assert_eq!(manager.config().pool.workers, 4);
    }

    #[test]
    fn test_file_then_env_layering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawler.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[sonar]
url = "http://sonar.internal:9000"

[pool]
workers = 2
termination = "eager"

[scan]
poll_interval_ms = 100
poll_max_wait_ms = 1000
"#
        )
        .unwrap();

        let manager = ConfigManager::load_from_sources(
            Some(&path),
            env(&[("CRAWLER_POOL__WORKERS", "6"), ("UNRELATED", "x")]),
        )
        .unwrap();
        let config = manager.config();

        assert_eq!(config.sonar.url, "http://sonar.internal:9000");
        assert_eq!(config.pool.workers, 6);
        assert_eq!(config.pool.termination, TerminationPolicy::Eager);
        assert_eq!(config.scan.poll_interval_ms, 100);
        assert_eq!(manager.config_file(), Some(path.as_path()));
    }

    #[test]
    fn test_legacy_env_overrides_win() {
        let manager = ConfigManager::load_from_sources(
            None,
            env(&[
                ("GITHUB_TOKEN", "ghp_secret"),
                ("SONARQUBE_URL", "http://sonar:9000"),
                ("SONARQUBE_TOKEN", "squ_secret"),
                ("WORKING_THREADS", "8"),
                ("LOG_LEVEL", "2"),
            ]),
        )
        .unwrap();
        let config = manager.config();

        assert_eq!(config.github.token.as_deref(), Some("ghp_secret"));
        assert_eq!(config.sonar.url, "http://sonar:9000");
        assert_eq!(config.sonar.token.as_deref(), Some("squ_secret"));
        assert_eq!(config.pool.workers, 8);
        assert_eq!(config.logging.level, 2);
    }

    #[test]
    fn test_invalid_legacy_override_is_reported() {
        let result = ConfigManager::load_from_sources(None, env(&[("WORKING_THREADS", "many")]));
        assert!(matches!(
            result,
            Err(ConfigurationError::EnvironmentOverrideError { ref key, .. }) if key == "WORKING_THREADS"
        ));
    }

    #[test]
    fn test_debug_config_masks_tokens() {
        let manager = ConfigManager::load_from_sources(
            None,
            env(&[("GITHUB_TOKEN", "ghp_secret"), ("SONARQUBE_TOKEN", "squ_secret")]),
        )
        .unwrap();
        let rendered = manager.debug_config().to_string();

        assert!(!rendered.contains("ghp_secret"));
        assert!(!rendered.contains("squ_secret"));
        assert!(rendered.contains("[MASKED]"));
    }
}
