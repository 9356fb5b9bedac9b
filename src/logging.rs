use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogConfig;

const LOG_FILE_PREFIX: &str = "restoreview.log";

/// Send tracing output to a daily rolling file.
///
/// Stdout and stderr belong to the command output. `RUST_LOG` takes
/// precedence over the configured filter. Keep the returned guard alive
/// until exit or buffered lines are lost.
pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
  let directory = config.resolve_directory()?;
  std::fs::create_dir_all(&directory).map_err(|e| {
    eyre!(
      "Failed to create log directory {}: {}",
      directory.display(),
      e
    )
  })?;

  let appender = tracing_appender::rolling::daily(&directory, LOG_FILE_PREFIX);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  fmt()
    .with_env_filter(filter(&config.filter))
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

fn filter(fallback: &str) -> EnvFilter {
  EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(fallback))
    .unwrap_or_else(|_| EnvFilter::new("info"))
}
