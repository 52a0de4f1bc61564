//! Tracing subscriber setup

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global subscriber, writing to `log_path`.
///
/// `RUST_LOG` takes precedence over `default_level`. The returned guard
/// flushes buffered lines on drop and must be held for the process lifetime.
pub fn init(
    log_path: &Path,
    default_level: &str,
    format: LogFormat,
) -> Result<WorkerGuard, Box<dyn std::error::Error + Send + Sync>> {
    let directory = log_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(directory)?;
    let file_name = log_path
        .file_name()
        .ok_or_else(|| format!("log path {:?} has no file name", log_path))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false);
    match format {
        LogFormat::Text => builder.try_init()?,
        LogFormat::Json => builder.json().try_init()?,
    }

    Ok(guard)
}
