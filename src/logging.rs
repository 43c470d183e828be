//! Console + rotating file logging
//!
//! Console output is human-readable; file output is JSON by default so request traces
//! (app, profile type, fan-out, partial failures) can be grepped after the fact.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// File name prefix for rolled log files
pub const LOG_FILE_PREFIX: &str = "profile_triage";

/// Filter used when neither `RUST_LOG` nor the config provides one
pub const DEFAULT_LEVEL_FILTER: &str = "info,profile_triage=info";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_dir: String,
    /// e.g. "info", "debug", "profile_triage::fleet=debug"
    pub level_filter: String,
    pub rotation: LogRotation,
    pub console_timestamps: bool,
    /// JSON lines in files instead of plain text
    pub file_json_format: bool,
    /// Log files older than this are removed at startup
    pub retention_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Daily,
    Hourly,
}

impl LogRotation {
    /// Unknown values fall back to daily
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "hourly" => LogRotation::Hourly,
            _ => LogRotation::Daily,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            level_filter: DEFAULT_LEVEL_FILTER.to_string(),
            rotation: LogRotation::Daily,
            console_timestamps: true,
            file_json_format: true,
            retention_days: 14,
        }
    }
}

fn env_or(level_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_filter))
}

/// Initialize dual output logging (console + rotating files)
///
/// Files land in `<log_dir>/profile_triage.log.YYYY-MM-DD` (or `-HH` when hourly).
/// The returned guard must be held for the life of the process or buffered lines are lost.
pub fn init_dual_logging(config: &LoggingConfig) -> Result<WorkerGuard, Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(&config.log_dir)?;

    let file_name = format!("{}.log", LOG_FILE_PREFIX);
    let file_appender: RollingFileAppender = match config.rotation {
        LogRotation::Daily => tracing_appender::rolling::daily(&config.log_dir, file_name),
        LogRotation::Hourly => tracing_appender::rolling::hourly(&config.log_dir, file_name),
    };
    let (file_writer, guard) = non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(true)
        .with_timer(if config.console_timestamps {
            ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f UTC".to_string())
        } else {
            ChronoUtc::new(String::new())
        })
        .with_filter(env_or(&config.level_filter));

    let file_layer = if config.file_json_format {
        fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_timer(ChronoUtc::new("%Y-%m-%dT%H:%M:%S%.3fZ".to_string()))
            .with_filter(env_or(&config.level_filter))
            .boxed()
    } else {
        fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_timer(ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f UTC".to_string()))
            .with_filter(env_or(&config.level_filter))
            .boxed()
    };

    tracing_subscriber::registry().with(console_layer).with(file_layer).try_init()?;

    tracing::info!(
        log_dir = %config.log_dir,
        rotation = ?config.rotation,
        json_format = config.file_json_format,
        "Dual logging initialized"
    );
    Ok(guard)
}

/// Console-only logging for tests and fallbacks
pub fn init_simple_logging(level_filter: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter(env_or(level_filter)).try_init()?;
    tracing::info!("Simple console logging initialized");
    Ok(())
}

fn is_log_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(LOG_FILE_PREFIX) && name.contains(".log"))
            .unwrap_or(false)
}

/// Rolled log files in `log_dir`, oldest name first
pub fn get_current_log_files(log_dir: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(log_dir)
        .map(|entries| entries.flatten().map(|e| e.path()).filter(|p| is_log_file(p)).collect())
        .unwrap_or_default();
    files.sort();
    files
}

/// Remove log files last modified more than `keep_days` ago
pub fn cleanup_old_logs(log_dir: &str, keep_days: u32) -> Result<usize, std::io::Error> {
    let Some(cutoff) = SystemTime::now().checked_sub(Duration::from_secs(keep_days as u64 * 24 * 3600)) else {
        return Ok(0);
    };
    let mut removed = 0;

    for path in get_current_log_files(log_dir) {
        let modified = path.metadata().and_then(|m| m.modified());
        if matches!(modified, Ok(time) if time < cutoff) && std::fs::remove_file(&path).is_ok() {
            removed += 1;
            tracing::debug!("Removed old log file: {:?}", path);
        }
    }

    if removed > 0 {
        tracing::info!("Cleaned up {} old log files (older than {} days)", removed, keep_days);
    }
    Ok(removed)
}

pub fn log_system_info() {
    tracing::info!(
        package_version = env!("CARGO_PKG_VERSION"),
        target_arch = std::env::consts::ARCH,
        target_os = std::env::consts::OS,
        cpu_count = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        "Environment information"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.level_filter, "info,profile_triage=info");
        assert_eq!(config.rotation, LogRotation::Daily);
        assert!(config.file_json_format);
        assert_eq!(config.retention_days, 14);
    }

    #[test]
    fn test_rotation_parse() {
        assert_eq!(LogRotation::parse("hourly"), LogRotation::Hourly);
        assert_eq!(LogRotation::parse(" Hourly "), LogRotation::Hourly);
        assert_eq!(LogRotation::parse("daily"), LogRotation::Daily);
        assert_eq!(LogRotation::parse("size:100"), LogRotation::Daily);
    }

    #[test]
    fn test_get_current_log_files() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path();

        std::fs::write(log_dir.join("profile_triage.log.2025-01-02"), "b").unwrap();
        std::fs::write(log_dir.join("profile_triage.log.2025-01-01"), "a").unwrap();
        std::fs::write(log_dir.join("other.log"), "x").unwrap();
        std::fs::write(log_dir.join("profile_triage.txt"), "x").unwrap();

        let files = get_current_log_files(log_dir.to_str().unwrap());
        assert_eq!(files.len(), 2);
        assert!(files[0].to_str().unwrap().ends_with("2025-01-01"));
        assert!(files[1].to_str().unwrap().ends_with("2025-01-02"));
    }

    #[test]
    fn test_cleanup_keeps_recent_files() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path();
        std::fs::write(log_dir.join("profile_triage.log.today"), "recent").unwrap();

        let removed = cleanup_old_logs(log_dir.to_str().unwrap(), 7).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(get_current_log_files(log_dir.to_str().unwrap()).len(), 1);
    }

    #[test]
    fn test_cleanup_with_huge_retention_keeps_everything() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path();
        std::fs::write(log_dir.join("profile_triage.log.old"), "x").unwrap();

        assert_eq!(cleanup_old_logs(log_dir.to_str().unwrap(), u32::MAX).unwrap(), 0);
        assert_eq!(get_current_log_files(log_dir.to_str().unwrap()).len(), 1);
    }

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        assert_eq!(cleanup_old_logs("/nonexistent/profile_triage_logs", 7).unwrap(), 0);
    }
}
