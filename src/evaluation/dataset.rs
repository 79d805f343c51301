//! Loading crawl result files into per-repository observations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, error};

use super::EvaluationError;
use crate::constants::metrics;
use crate::models::scan_result::metric_as_f64;

/// One repository's stars and normalized quality metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub repo: String,
    pub stars: f64,
    pub smells: f64,
    pub complexity: f64,
}

/// Read one result file; the top level must be a `{repo: metrics}` object.
///
/// Individual records missing a required metric are logged and skipped.
pub fn load_file(path: &Path) -> Result<Vec<Observation>, EvaluationError> {
    debug!(path = %path.display(), "Loading data");

    let content = fs::read_to_string(path).map_err(|source| EvaluationError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|source| EvaluationError::Json {
        path: path.display().to_string(),
        source,
    })?;
    let Value::Object(records) = value else {
        return Err(EvaluationError::NotAnObject {
            path: path.display().to_string(),
        });
    };

    Ok(records
        .into_iter()
        .filter_map(|(repo, record)| match parse_record(&repo, &record) {
            Ok(observation) => Some(observation),
            Err(reason) => {
                error!(
                    repository = %repo,
                    path = %path.display(),
                    "Error processing repository: {reason}"
                );
                None
            }
        })
        .collect())
}

/// Load and concatenate several files. Unreadable files contribute nothing.
pub fn load_group<P: AsRef<Path>>(paths: &[P]) -> Vec<Observation> {
    paths
        .iter()
        .flat_map(|path| {
            load_file(path.as_ref()).unwrap_or_else(|e| {
                error!("Error loading file: {e}");
                Vec::new()
            })
        })
        .collect()
}

fn parse_record(repo: &str, record: &Value) -> Result<Observation, String> {
    let fields = record
        .as_object()
        .ok_or_else(|| "record is not an object".to_string())?;

    Ok(Observation {
        repo: repo.to_string(),
        stars: required(fields, metrics::STARS)?,
        smells: required(fields, metrics::NORM_CODE_SMELLS)?,
        complexity: required(fields, metrics::NORM_COGNITIVE_COMPLEXITY)?,
    })
}

fn required(fields: &Map<String, Value>, key: &str) -> Result<f64, String> {
    let value = fields.get(key).ok_or_else(|| format!("missing '{key}'"))?;
    metric_as_f64(value).ok_or_else(|| format!("'{key}' is not numeric: {value}"))
}
