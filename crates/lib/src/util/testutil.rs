//! Test utilities for slipway-lib.
//!
//! Cross-platform helpers for tests that stand in a shell script for the
//! real publish toolchain.

use std::path::{Path, PathBuf};

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// Write an executable script that ignores its arguments and runs `body`.
///
/// Used as a stand-in publish tool so the suite never needs a real SDK.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join("fake-tool.sh");
  std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  path
}

#[cfg(windows)]
pub fn fake_tool(dir: &Path, body: &str) -> PathBuf {
  let path = dir.join("fake-tool.cmd");
  std::fs::write(&path, format!("@echo off\r\n{body}\r\n")).unwrap();
  path
}
