//! Project configuration for publish runs.
//!
//! Settings load from an optional `slipway.toml` in the project root;
//! anything not specified falls back to conventional defaults.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the optional per-project configuration file.
pub const CONFIG_FILE: &str = "slipway.toml";

/// Program driving builds when no override is configured.
pub const DEFAULT_TOOL: &str = "dotnet";

/// Errors raised while loading project configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read { path: PathBuf, source: std::io::Error },

  #[error("failed to parse {path}: {source}")]
  Parse { path: PathBuf, source: toml::de::Error },

  #[error("failed to resolve project root {path}: {source}")]
  Resolve { path: PathBuf, source: std::io::Error },

  /// No project file was configured and none could be discovered.
  #[error("no .csproj found in {0}; set project_file in slipway.toml")]
  NoProjectFile(PathBuf),
}

/// Build configuration forwarded to the publish toolchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Configuration {
  Debug,
  #[default]
  Release,
}

impl Configuration {
  /// Returns the spelling the toolchain expects after `-c`
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Debug => "Debug",
      Self::Release => "Release",
    }
  }

  /// Lowercased form used in archive names
  pub fn lower(self) -> &'static str {
    match self {
      Self::Debug => "debug",
      Self::Release => "release",
    }
  }
}

impl fmt::Display for Configuration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Options chosen per run rather than per project.
#[derive(Debug, Clone, Copy)]
pub struct BuildSettings {
  pub configuration: Configuration,

  /// Bundle the runtime so target machines need no separate install.
  pub standalone: bool,
}

impl Default for BuildSettings {
  fn default() -> Self {
    Self {
      configuration: Configuration::default(),
      standalone: true,
    }
  }
}

/// Raw `slipway.toml` contents before path resolution.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
  name: Option<String>,
  project_file: Option<PathBuf>,
  tool: Option<String>,
  publish_dir: Option<PathBuf>,
  logs_dir: Option<PathBuf>,
}

/// Resolved project layout for one build run.
///
/// All paths are absolute; relative settings resolve against `root`.
#[derive(Debug, Clone)]
pub struct Project {
  /// Canonical project root.
  pub root: PathBuf,

  /// Archive name prefix; defaults to the project file stem.
  pub name: String,

  /// Project file handed to the publish toolchain.
  pub project_file: PathBuf,

  /// Program driving builds; `dotnet` unless overridden.
  pub tool: String,

  /// Per-target output directories and finished archives land here.
  pub publish_dir: PathBuf,

  /// One log file per attempt lands here.
  pub logs_dir: PathBuf,
}

impl Project {
  /// Load the project rooted at `root`, reading `slipway.toml` when present
  pub fn load(root: &Path) -> Result<Self, ConfigError> {
    let root = dunce::canonicalize(root).map_err(|source| ConfigError::Resolve {
      path: root.to_path_buf(),
      source,
    })?;

    let config_path = root.join(CONFIG_FILE);
    let raw = if config_path.exists() {
      let text = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
        path: config_path.clone(),
        source,
      })?;
      toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: config_path.clone(),
        source,
      })?
    } else {
      RawConfig::default()
    };

    Self::resolve(root, raw)
  }

  fn resolve(root: PathBuf, raw: RawConfig) -> Result<Self, ConfigError> {
    let project_file = match raw.project_file {
      Some(path) => resolve_path(&root, path),
      None => find_project_file(&root)?,
    };

    let name = match raw.name {
      Some(name) => name,
      None => project_file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string()),
    };

    Ok(Self {
      publish_dir: resolve_path(&root, raw.publish_dir.unwrap_or_else(|| PathBuf::from("publish"))),
      logs_dir: resolve_path(&root, raw.logs_dir.unwrap_or_else(|| PathBuf::from("build_logs"))),
      tool: raw.tool.unwrap_or_else(|| DEFAULT_TOOL.to_string()),
      root,
      name,
      project_file,
    })
  }
}

fn resolve_path(root: &Path, path: PathBuf) -> PathBuf {
  if path.is_absolute() { path } else { root.join(path) }
}

/// Pick the project file when the config doesn't name one.
///
/// Scans the root for `.csproj` entries; the lexicographically first one
/// wins so repeated runs agree.
fn find_project_file(root: &Path) -> Result<PathBuf, ConfigError> {
  let entries = std::fs::read_dir(root).map_err(|source| ConfigError::Read {
    path: root.to_path_buf(),
    source,
  })?;

  let mut candidates: Vec<PathBuf> = entries
    .filter_map(|entry| entry.ok())
    .map(|entry| entry.path())
    .filter(|path| {
      path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csproj"))
    })
    .collect();
  candidates.sort();

  candidates
    .into_iter()
    .next()
    .ok_or_else(|| ConfigError::NoProjectFile(root.to_path_buf()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn project_dir(config: Option<&str>, files: &[&str]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for file in files {
      std::fs::write(temp.path().join(file), "").unwrap();
    }
    if let Some(config) = config {
      std::fs::write(temp.path().join(CONFIG_FILE), config).unwrap();
    }
    temp
  }

  #[test]
  fn defaults_derive_from_discovered_project_file() {
    let temp = project_dir(None, &["Game.csproj"]);
    let project = Project::load(temp.path()).unwrap();

    assert_eq!(project.name, "Game");
    assert_eq!(project.tool, DEFAULT_TOOL);
    assert_eq!(project.publish_dir, project.root.join("publish"));
    assert_eq!(project.logs_dir, project.root.join("build_logs"));
    assert!(project.project_file.ends_with("Game.csproj"));
  }

  #[test]
  fn config_file_overrides_defaults() {
    let config = r#"
name = "shipped"
project_file = "src/App.csproj"
tool = "/opt/dotnet/dotnet"
publish_dir = "out"
logs_dir = "logs"
"#;
    let temp = project_dir(Some(config), &[]);
    let project = Project::load(temp.path()).unwrap();

    assert_eq!(project.name, "shipped");
    assert_eq!(project.tool, "/opt/dotnet/dotnet");
    assert_eq!(project.project_file, project.root.join("src/App.csproj"));
    assert_eq!(project.publish_dir, project.root.join("out"));
    assert_eq!(project.logs_dir, project.root.join("logs"));
  }

  #[test]
  fn missing_project_file_is_an_error() {
    let temp = project_dir(None, &[]);
    assert!(matches!(
      Project::load(temp.path()),
      Err(ConfigError::NoProjectFile(_))
    ));
  }

  #[test]
  fn unknown_config_keys_are_rejected() {
    let temp = project_dir(Some("unknown_key = 1\n"), &["App.csproj"]);
    assert!(matches!(Project::load(temp.path()), Err(ConfigError::Parse { .. })));
  }

  #[test]
  fn configuration_spellings() {
    assert_eq!(Configuration::Release.as_str(), "Release");
    assert_eq!(Configuration::Release.lower(), "release");
    assert_eq!(Configuration::Debug.to_string(), "Debug");
  }
}
