pub mod job;
pub mod repository;
pub mod scan_result;

// Re-export core models for easy access
pub use job::Job;
pub use repository::Repository;
pub use scan_result::{normalize, NormalizedMetrics, ScanResult};
