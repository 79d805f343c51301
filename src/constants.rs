//! # System Constants
//!
//! Fixed policy values and wire-level names shared by the crawler, the scan
//! engine and the evaluation tooling.

use std::time::Duration;

/// Total scan attempts a repository gets before it is recorded as permanently failed
pub const MAX_ATTEMPTS: u32 = 3;

/// Default number of concurrent workers draining the job queue
pub const DEFAULT_WORKERS: usize = 4;

/// Default interval between two analysis-service polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default ceiling on the total time spent polling for measures of one project
pub const DEFAULT_POLL_MAX_WAIT: Duration = Duration::from_secs(120);

/// Shortest accepted poll interval; a zero interval would never use up the wait budget
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Metric keys requested from and stored for the analysis service
pub mod metrics {
    pub const NCLOC: &str = "ncloc";
    pub const CODE_SMELLS: &str = "code_smells";
    pub const COGNITIVE_COMPLEXITY: &str = "cognitive_complexity";
    pub const STARS: &str = "stars";
    pub const NORM_CODE_SMELLS: &str = "norm_code_smells";
    pub const NORM_COGNITIVE_COMPLEXITY: &str = "norm_cognitive_complexity";

    /// Metrics polled from the analysis service, in request order
    pub const REQUESTED: [&str; 3] = [NCLOC, COGNITIVE_COMPLEXITY, CODE_SMELLS];
}

/// File types that need a separate compilation toolchain and are kept out of
/// analysis scope
pub const EXCLUDED_SOURCE_PATTERNS: [&str; 15] = [
    "**/*.java",
    "**/*.cs",
    "**/*.cpp",
    "**/*.cc",
    "**/*.cxx",
    "**/*.c",
    "**/*.scala",
    "**/*.kt",
    "**/*.kts",
    "**/*.swift",
    "**/*.m",
    "**/*.mm",
    "**/*.rs",
    "**/*.vb",
    "**/*.vbs",
];

/// Comma-joined exclusion list in the form the scanner CLI expects
pub fn source_exclusions() -> String {
    EXCLUDED_SOURCE_PATTERNS.join(",")
}
