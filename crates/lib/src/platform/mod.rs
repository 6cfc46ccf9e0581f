pub mod arch;
pub mod os;

pub use arch::Arch;
pub use os::Os;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while selecting or parsing build targets.
///
/// These are input-validation errors surfaced to the caller before any
/// build starts; they are never recorded as build failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
  /// The OS part of a target string is not in the matrix.
  #[error("unknown operating system: {0}")]
  UnknownOs(String),

  /// The architecture part of a target string is not in the matrix.
  #[error("unknown architecture: {0}")]
  UnknownArch(String),

  /// The target string is not of the form `<os>-<arch>`.
  #[error("expected <os>-<arch>, got: {0}")]
  Malformed(String),

  /// Both parts are known but the combination is not supported.
  #[error("{os} builds do not support {arch}")]
  Unsupported { os: Os, arch: Arch },
}

/// One (platform, architecture) pair selected for a build/package cycle
///
/// Immutable once constructed; construction validates against the
/// supported matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
  os: Os,
  arch: Arch,
}

impl Target {
  /// Create a target, rejecting pairs outside the supported matrix
  pub fn new(os: Os, arch: Arch) -> Result<Self, TargetError> {
    if os.supported_archs().contains(&arch) {
      Ok(Self { os, arch })
    } else {
      Err(TargetError::Unsupported { os, arch })
    }
  }

  /// Parse a `<os>-<arch>` string such as "windows-x64"
  pub fn parse(s: &str) -> Result<Self, TargetError> {
    let (os, arch) = s.split_once('-').ok_or_else(|| TargetError::Malformed(s.to_string()))?;
    Self::new(Os::parse(os)?, Arch::parse(arch)?)
  }

  pub fn os(&self) -> Os {
    self.os
  }

  pub fn arch(&self) -> Arch {
    self.arch
  }

  /// Runtime identifier passed to the publish toolchain, e.g. "win-x64"
  pub fn rid(&self) -> String {
    format!("{}-{}", self.os.rid_tag(), self.arch)
  }

  /// Name used for directories, logs, and archives, e.g. "windows-x64"
  pub fn slug(&self) -> String {
    format!("{}-{}", self.os.name(), self.arch)
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.slug())
  }
}

impl std::str::FromStr for Target {
  type Err = TargetError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

/// Full cross-product of supported targets, in declaration order
pub fn matrix() -> Vec<Target> {
  Os::all()
    .iter()
    .flat_map(|&os| os.supported_archs().iter().map(move |&arch| Target { os, arch }))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rid_uses_os_tag() {
    let target = Target::new(Os::Windows, Arch::X64).unwrap();
    assert_eq!(target.rid(), "win-x64");
    assert_eq!(target.slug(), "windows-x64");

    let target = Target::new(Os::MacOs, Arch::Arm64).unwrap();
    assert_eq!(target.rid(), "osx-arm64");
  }

  #[test]
  fn unsupported_pair_is_rejected() {
    assert_eq!(
      Target::new(Os::Linux, Arch::X86),
      Err(TargetError::Unsupported {
        os: Os::Linux,
        arch: Arch::X86,
      })
    );
  }

  #[test]
  fn parse_roundtrips_through_slug() {
    for target in matrix() {
      assert_eq!(Target::parse(&target.slug()).unwrap(), target);
    }
  }

  #[test]
  fn parse_rejects_bad_input() {
    assert!(matches!(Target::parse("linux"), Err(TargetError::Malformed(_))));
    assert!(matches!(Target::parse("plan9-x64"), Err(TargetError::UnknownOs(_))));
    assert!(matches!(Target::parse("linux-x86"), Err(TargetError::Unsupported { .. })));
  }

  #[test]
  fn matrix_covers_every_supported_pair() {
    let all = matrix();
    assert_eq!(all.len(), 7);
    assert!(all.contains(&Target::new(Os::Windows, Arch::X86).unwrap()));
    assert!(!all.iter().any(|t| t.os() == Os::Linux && t.arch() == Arch::X86));
  }
}
