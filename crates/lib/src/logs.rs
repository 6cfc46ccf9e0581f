//! Persistent per-attempt build logs.

use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use tracing::debug;

use crate::platform::Target;

/// Errors raised while persisting a build log.
#[derive(Debug, Error)]
pub enum LogError {
  #[error("failed to create log directory {path}: {source}")]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to write log {path}: {source}")]
  Write { path: PathBuf, source: std::io::Error },
}

/// Write the log artifact for one concluded attempt.
///
/// File names carry a millisecond timestamp; if two attempts for the
/// same target still land on the same name, a numeric suffix keeps them
/// apart. A log is never overwritten or combined with an earlier one.
pub fn write_build_log(logs_dir: &Path, target: Target, success: bool, output: &str) -> Result<PathBuf, LogError> {
  std::fs::create_dir_all(logs_dir).map_err(|source| LogError::CreateDir {
    path: logs_dir.to_path_buf(),
    source,
  })?;

  let stamp = Local::now().format("%Y%m%d_%H%M%S_%3f");
  let base = format!("build_{}_{}_{}", target.os().name(), target.arch(), stamp);
  let path = unique_log_path(logs_dir, &base);

  let status = if success { "Success" } else { "Failed" };
  let contents = format!(
    "Build for {}\nStatus: {}\n=== Build Output ===\n{}",
    target.slug(),
    status,
    output
  );

  std::fs::write(&path, contents).map_err(|source| LogError::Write {
    path: path.clone(),
    source,
  })?;

  debug!(path = %path.display(), "build log written");
  Ok(path)
}

/// First free `<base>.log`, `<base>_1.log`, `<base>_2.log`, ... path.
fn unique_log_path(dir: &Path, base: &str) -> PathBuf {
  let mut path = dir.join(format!("{base}.log"));
  let mut attempt = 1u32;
  while path.exists() {
    path = dir.join(format!("{base}_{attempt}.log"));
    attempt += 1;
  }
  path
}
