use std::fmt;

use serde::{Deserialize, Serialize};

use super::TargetError;
use super::arch::Arch;

/// Operating systems the publish matrix can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
  Windows,
  Linux,
  MacOs,
}

impl Os {
  /// Returns the lowercase name used in directory, log, and archive names
  pub fn name(&self) -> &'static str {
    match self {
      Self::Windows => "windows",
      Self::Linux => "linux",
      Self::MacOs => "osx",
    }
  }

  /// Returns the tag used when composing runtime identifiers
  ///
  /// Tags are unique across operating systems.
  pub fn rid_tag(&self) -> &'static str {
    match self {
      Self::Windows => "win",
      Self::Linux => "linux",
      Self::MacOs => "osx",
    }
  }

  /// Architectures the publish toolchain supports for this OS
  pub fn supported_archs(&self) -> &'static [Arch] {
    match self {
      Self::Windows => &[Arch::X64, Arch::X86, Arch::Arm64],
      Self::Linux => &[Arch::X64, Arch::Arm64],
      Self::MacOs => &[Arch::X64, Arch::Arm64],
    }
  }

  /// All operating systems in the matrix, in declaration order
  pub fn all() -> &'static [Os] {
    &[Self::Windows, Self::Linux, Self::MacOs]
  }

  pub fn parse(s: &str) -> Result<Self, TargetError> {
    match s.to_ascii_lowercase().as_str() {
      "windows" => Ok(Self::Windows),
      "linux" => Ok(Self::Linux),
      "osx" => Ok(Self::MacOs),
      _ => Err(TargetError::UnknownOs(s.to_string())),
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

impl std::str::FromStr for Os {
  type Err = TargetError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}
