use std::fs;
use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::domain::DomainError;

const LOG_FILE_PREFIX: &str = "camtune.log";

/// Install the global subscriber: terse stderr output for the control panel,
/// plus a daily JSON file under `logs_dir` when `file_logging` is set.
///
/// `RUST_LOG` replaces the console filter. The returned guard flushes the
/// file writer on drop and must outlive the session.
pub fn init_logging(
    logs_dir: &Path,
    level: &str,
    file_logging: bool,
) -> Result<Option<WorkerGuard>, DomainError> {
    let level = parse_level(level)?;

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_filter(console_filter(level));

    let (file, guard) = if file_logging {
        fs::create_dir_all(logs_dir)?;
        let (writer, guard) =
            tracing_appender::non_blocking(RollingFileAppender::new(Rotation::DAILY, logs_dir, LOG_FILE_PREFIX));
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(crate_filter(level, "off"));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // A second install (tests, embedding) keeps the first subscriber.
    if tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .is_ok()
    {
        tracing::debug!(
            %level,
            logs_dir = ?file_logging.then_some(logs_dir),
            "Logging ready"
        );
    }
    Ok(guard)
}

/// Accepts the level names offered by `--log-level` and `[logging] level`.
fn parse_level(level: &str) -> Result<Level, DomainError> {
    level.trim().parse::<Level>().map_err(|_| {
        DomainError::Config(format!(
            "Unknown log level '{}'; expected trace, debug, info, warn or error",
            level
        ))
    })
}

fn console_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| crate_filter(level, "warn"))
}

/// Our binary and library at `level`; dependencies (reqwest, hyper, v4l) at `others`.
fn crate_filter(level: Level, others: &str) -> EnvFilter {
    let level = level.as_str().to_ascii_lowercase();
    EnvFilter::new(format!("camtune={level},camtune_lib={level},{others}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names_are_case_insensitive() {
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level(" WARN ").unwrap(), Level::WARN);
    }

    #[test]
    fn test_unknown_level_is_config_error() {
        match parse_level("verbose") {
            Err(DomainError::Config(message)) => assert!(message.contains("verbose")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_crate_filter_limits_dependencies() {
        let filter = crate_filter(Level::TRACE, "off").to_string();
        assert!(filter.contains("camtune=trace"));
        assert!(filter.contains("camtune_lib=trace"));
        assert!(filter.contains("off"));
    }

    #[test]
    fn test_console_only_install_creates_no_log_dir() {
        let dir = std::env::temp_dir().join(format!("camtune_logs_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let guard = init_logging(&dir, "info", false).unwrap();
        assert!(guard.is_none());
        assert!(!dir.exists());
    }

    #[test]
    fn test_bad_level_rejected_before_install() {
        let dir = std::env::temp_dir().join("camtune_logs_bad_level");
        assert!(init_logging(&dir, "loud", true).is_err());
        assert!(!dir.exists());
    }
}
