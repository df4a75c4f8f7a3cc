//! Console and rotating file logging.
//!
//! The console layer writes to stderr so the captured stream can go to
//! stdout. The file layer is optional and rotates daily; files older than
//! the retention period are removed at startup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Base name of the rotated log files.
const LOG_FILE_NAME: &str = "bdacap.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Directory for rotated log files. `None` logs to the console only.
    pub log_dir: Option<PathBuf>,
    pub retention_days: u64,
    pub verbose: bool,
    /// Filter directive used when `RUST_LOG` is unset, e.g. `"bdasrc=trace"`.
    pub level: Option<String>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            log_dir: None,
            retention_days: 7,
            verbose: false,
            level: None,
        }
    }
}

impl LoggingOptions {
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()))
    }

    fn directive(&self) -> &str {
        match &self.level {
            Some(level) => level,
            None if self.verbose => "debug",
            None => "info",
        }
    }
}

/// Install the global subscriber and bridge `log` records into it.
pub fn init_logging(options: &LoggingOptions) -> Result<(), Box<dyn std::error::Error>> {
    let file_layer = match &options.log_dir {
        Some(log_dir) => {
            fs::create_dir_all(log_dir)?;
            clean_old_logs(log_dir, options.retention_days)?;

            let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            // Flushes on drop; must outlive every log call.
            let _ = Box::leak(Box::new(guard));

            Some(
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false)
                    .with_timer(LocalTimeTimer),
            )
        }
        None => None,
    };

    let subscriber = tracing_subscriber::registry()
        .with(options.filter())
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_timer(LocalTimeTimer),
        )
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to set default subscriber: {}", e))?;
    tracing_log::LogTracer::init().map_err(|e| format!("Failed to initialize LogTracer: {}", e))?;

    Ok(())
}

/// Remove rotated log files last modified before the retention cutoff.
fn clean_old_logs(log_dir: &Path, retention_days: u64) -> io::Result<()> {
    let cutoff = Local::now() - chrono::Duration::days(retention_days as i64);

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !is_log_file(&path) {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => chrono::DateTime::<Local>::from(modified),
            Err(_) => continue,
        };
        if modified < cutoff {
            if let Err(e) = fs::remove_file(&path) {
                eprintln!("Failed to remove old log file {:?}: {}", path, e);
            }
        }
    }

    Ok(())
}

fn is_log_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| name.starts_with(LOG_FILE_NAME))
}

/// Local time with microseconds.
#[derive(Debug, Clone, Copy)]
struct LocalTimeTimer;

impl fmt::time::FormatTime for LocalTimeTimer {
    fn format_time(&self, w: &mut fmt::format::Writer) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.6f"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive() {
        let mut options = LoggingOptions::default();
        assert_eq!(options.directive(), "info");
        options.verbose = true;
        assert_eq!(options.directive(), "debug");
        options.level = Some("bdasrc=trace".into());
        assert_eq!(options.directive(), "bdasrc=trace");
    }

    #[test]
    fn test_is_log_file() {
        assert!(is_log_file(Path::new("/var/log/bdacap.log.2026-10-16")));
        assert!(is_log_file(Path::new("bdacap.log")));
        assert!(!is_log_file(Path::new("/var/log/other.log")));
    }

    #[test]
    fn test_clean_old_logs_keeps_recent_files() {
        let dir = std::env::temp_dir().join(format!("bdacap-logs-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let log = dir.join("bdacap.log.2026-10-16");
        let other = dir.join("notes.txt");
        fs::write(&log, b"x").unwrap();
        fs::write(&other, b"x").unwrap();

        clean_old_logs(&dir, 7).unwrap();
        assert!(log.exists());
        assert!(other.exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}
