//! Result file writer

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{CrawlerError, Result};
use crate::models::ScanResult;

/// Serialize the full result map as pretty JSON, creating parent directories
pub fn write_results(path: &Path, results: &BTreeMap<String, ScanResult>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| CrawlerError::output(parent.display().to_string(), e))?;
    }

    let json = serde_json::to_string_pretty(results)?;
    fs::write(path, json).map_err(|e| CrawlerError::output(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_writes_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("python").join("results.json");

        let mut results = BTreeMap::new();
        results.insert(
            "alice:foo".to_string(),
            ScanResult::from_measures(
                [("ncloc".to_string(), "100".to_string())].into_iter().collect(),
                3,
            ),
        );
        write_results(&path, &results).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["alice:foo"]["ncloc"], "100");
        assert_eq!(written["alice:foo"]["stars"], 3);
    }

    #[test]
    fn test_empty_results_still_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        write_results(&path, &BTreeMap::new()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_unwritable_target_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be overwritten as a file
        let err = write_results(dir.path(), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, CrawlerError::Output { .. }));
    }
}
