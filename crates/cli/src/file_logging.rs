//! Logging setup for the `failure-excerpt` binary.
//!
//! Console output always goes to stderr so stdout carries only the excerpt.
//! File logging is optional and enabled via the `FX_FILE_LOGGING`
//! environment variable; files rotate daily.
//!
//! # Configuration
//!
//! - `FX_FILE_LOGGING`: Set to "true" or "1" to enable file logging
//! - `FX_LOG_DIR`: Override default log directory (defaults to `{asset_dir}/logs`)
//! - `FX_LOG_MAX_FILES`: Number of daily log files to retain (default: 7)
//!
//! Log files use JSON lines:
//! ```json
//! {"timestamp":"2026-10-16T10:30:00Z","level":"INFO","target":"services","message":"..."}
//! ```

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};
use utils::assets::log_dir;

const LOG_FILE_PREFIX: &str = "failure-excerpt.log";

#[derive(Debug, Clone)]
pub struct FileLoggingConfig {
    pub enabled: bool,
    pub log_dir: PathBuf,
    /// Number of daily log files to retain.
    pub max_files: usize,
}

impl FileLoggingConfig {
    pub fn from_env() -> Self {
        let enabled = std::env::var("FX_FILE_LOGGING")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let max_files = std::env::var("FX_LOG_MAX_FILES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(7);

        Self {
            enabled,
            log_dir: log_dir(),
            max_files,
        }
    }
}

/// Filter applied to our crates at `log_level`, everything else at `warn`.
/// `RUST_LOG` overrides it when set.
fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = format!(
            "warn,cli={level},services={level},db={level},utils={level}",
            level = log_level
        );
        EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("warn"))
    })
}

/// Initialize logging. The returned guard must be held until exit so
/// buffered file output is flushed; `None` when file logging is off.
pub fn init_logging(log_level: &str) -> Option<WorkerGuard> {
    let config = FileLoggingConfig::from_env();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(build_filter(log_level));

    if !config.enabled {
        tracing_subscriber::registry().with(console_layer).init();
        return None;
    }

    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!("Failed to create log directory {:?}: {}", config.log_dir, e);
        tracing_subscriber::registry().with(console_layer).init();
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(build_filter(log_level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!(
        log_dir = ?config.log_dir,
        max_files = config.max_files,
        "File logging enabled"
    );

    cleanup_old_logs(&config.log_dir, config.max_files);

    Some(guard)
}

/// Delete all but the newest `max_files` rotated logs. Daily rotation
/// appends the date to [`LOG_FILE_PREFIX`], so names sort chronologically.
fn cleanup_old_logs(log_dir: &Path, max_files: usize) {
    let Ok(entries) = std::fs::read_dir(log_dir) else {
        return;
    };

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok()?.file_name().into_string().ok())
        .filter(|name| name.starts_with(LOG_FILE_PREFIX))
        .collect();
    names.sort_unstable_by(|a, b| b.cmp(a));

    for name in names.iter().skip(max_files) {
        let path = log_dir.join(name);
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = ?path, "Removed old log file"),
            Err(e) => tracing::warn!(path = ?path, error = %e, "Failed to remove old log file"),
        }
    }
}
