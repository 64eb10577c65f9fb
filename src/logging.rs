use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter, e.g. `SHELF_LOG=shelf=debug`.
pub const LOG_ENV: &str = "SHELF_LOG";

/// Install the global subscriber, writing to a file since the terminal belongs to the UI.
///
/// With an explicit `log_file` that file is appended to; otherwise logs roll
/// daily under `<data_dir>/logs`. Keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init(log_file: Option<&Path>, data_dir: &Path) -> Result<WorkerGuard> {
  let (dir, prefix) = match log_file {
    Some(path) => split_log_path(path)?,
    None => (data_dir.join("logs"), "shelf.log".to_string()),
  };
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = match log_file {
    Some(_) => tracing_appender::rolling::never(&dir, &prefix),
    None => tracing_appender::rolling::daily(&dir, &prefix),
  };
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .with_env_var(LOG_ENV)
    .from_env_lossy();

  tracing_subscriber::registry()
    .with(filter)
    .with(
      fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

  Ok(guard)
}

fn split_log_path(path: &Path) -> Result<(PathBuf, String)> {
  let name = path
    .file_name()
    .and_then(|n| n.to_str())
    .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;
  let dir = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
    _ => PathBuf::from("."),
  };
  Ok((dir, name.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_split_log_path() {
    let (dir, name) = split_log_path(Path::new("/tmp/shelf/debug.log")).unwrap();
    assert_eq!(dir, PathBuf::from("/tmp/shelf"));
    assert_eq!(name, "debug.log");
  }

  #[test]
  fn test_bare_file_name_logs_to_cwd() {
    let (dir, name) = split_log_path(Path::new("shelf.log")).unwrap();
    assert_eq!(dir, PathBuf::from("."));
    assert_eq!(name, "shelf.log");
  }

  #[test]
  fn test_directory_path_is_rejected() {
    assert!(split_log_path(Path::new("/")).is_err());
  }
}
