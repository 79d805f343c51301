//! # Scan Results
//!
//! The normalized metric record produced by one successful scan. An empty
//! record is the designated "scan failed" sentinel; a successful record always
//! carries the raw measures, the star count and both per-NCLOC fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::constants::metrics;

/// Metric name to value mapping for one repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanResult {
    metrics: BTreeMap<String, Value>,
}

/// Code smells and cognitive complexity per non-comment line of code
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetrics {
    pub norm_code_smells: f64,
    pub norm_cognitive_complexity: f64,
}

/// Divide smell and complexity counts by NCLOC.
///
/// A zero (or negative) line count yields exactly zero for both fields rather
/// than a division error, so downstream statistics never see NaN or infinity.
pub fn normalize(ncloc: f64, code_smells: f64, cognitive_complexity: f64) -> NormalizedMetrics {
    if ncloc > 0.0 {
        NormalizedMetrics {
            norm_code_smells: code_smells / ncloc,
            norm_cognitive_complexity: cognitive_complexity / ncloc,
        }
    } else {
        NormalizedMetrics {
            norm_code_smells: 0.0,
            norm_cognitive_complexity: 0.0,
        }
    }
}

/// Read a metric stored either as a JSON number or as a numeric string
pub fn metric_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

impl ScanResult {
    /// The failure sentinel
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the full record from raw analysis-service measures.
    ///
    /// Returns the empty sentinel when no measures were returned. Missing or
    /// unparsable counts are treated as zero for normalization.
    pub fn from_measures(measures: BTreeMap<String, String>, stars: u64) -> Self {
        if measures.is_empty() {
            return Self::empty();
        }

        let count = |key: &str| {
            measures
                .get(key)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .unwrap_or(0.0)
        };
        let normalized = normalize(
            count(metrics::NCLOC),
            count(metrics::CODE_SMELLS),
            count(metrics::COGNITIVE_COMPLEXITY),
        );

        let mut record: BTreeMap<String, Value> = measures
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        record.insert(metrics::STARS.to_string(), Value::from(stars));
        record.insert(
            metrics::NORM_CODE_SMELLS.to_string(),
            Value::from(normalized.norm_code_smells),
        );
        record.insert(
            metrics::NORM_COGNITIVE_COMPLEXITY.to_string(),
            Value::from(normalized.norm_cognitive_complexity),
        );

        Self { metrics: record }
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn get(&self, metric: &str) -> Option<&Value> {
        self.metrics.get(metric)
    }

    pub fn metric_f64(&self, metric: &str) -> Option<f64> {
        self.get(metric).and_then(metric_as_f64)
    }

    pub fn metrics(&self) -> &BTreeMap<String, Value> {
        &self.metrics
    }
}

impl FromIterator<(String, Value)> for ScanResult {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            metrics: iter.into_iter().collect(),
        }
    }
}
