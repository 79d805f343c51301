//! # Structured Logging Module
//!
//! Console plus optional JSON-file logging for crawl and evaluation runs.
//! `RUST_LOG` always wins; otherwise the numeric crawler log level selects
//! the filter (0 = warn, 1 = info, 2+ = debug).

use chrono::Utc;
use std::fs;
use std::path::Path;
use std::process;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

static LOGGER_INITIALIZED: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Initialize structured logging once per process; later calls are no-ops
pub fn init_structured_logging(app_name: &str, config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = filter_directive(config.level);
        let pid = process::id();

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(build_filter(&filter));

        let file_target = if config.file_output {
            open_log_file(app_name, &config.log_dir, pid)
        } else {
            None
        };

        let (file_layer, guard, log_file) = match file_target {
            Some((file_name, appender)) => {
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(build_filter(&filter));
                (Some(layer), Some(guard), Some(config.log_dir.join(file_name)))
            }
            None => (None, None, None),
        };

        let subscriber = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer);

        // A test harness or embedding application may already own the global subscriber
        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = pid,
            filter = %filter,
            log_file = ?log_file.as_ref().map(|p| p.display().to_string()),
            "🔧 LOGGING: Initialized"
        );

        guard
    });
}

fn build_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

fn open_log_file(
    app_name: &str,
    log_dir: &Path,
    pid: u32,
) -> Option<(String, tracing_appender::rolling::RollingFileAppender)> {
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!(
            "Failed to create log directory {}: {e}; logging to console only",
            log_dir.display()
        );
        return None;
    }

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let file_name = format!("{app_name}.{pid}.{timestamp}.log");
    let appender = tracing_appender::rolling::never(log_dir, &file_name);
    Some((file_name, appender))
}

/// Map the numeric crawler log level to a filter directive
fn filter_directive(level: u8) -> String {
    let crate_level = match level {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    format!("warn,smell_of_stars={crate_level},crawl={crate_level},evaluate={crate_level}")
}

/// Log structured data for job lifecycle transitions
pub fn log_job_operation(
    operation: &str,
    job_key: &str,
    attempt: u32,
    state: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        job_key = %job_key,
        attempt = attempt,
        state = %state,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 JOB_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
