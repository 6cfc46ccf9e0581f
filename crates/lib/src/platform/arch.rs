use std::fmt;

use serde::{Deserialize, Serialize};

use super::TargetError;

/// CPU architecture variants appearing in the publish matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
  X64,
  X86,
  Arm64,
}

impl Arch {
  /// Returns the lowercase string identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X64 => "x64",
      Self::X86 => "x86",
      Self::Arm64 => "arm64",
    }
  }

  pub fn parse(s: &str) -> Result<Self, TargetError> {
    match s.to_ascii_lowercase().as_str() {
      "x64" => Ok(Self::X64),
      "x86" => Ok(Self::X86),
      "arm64" => Ok(Self::Arm64),
      _ => Err(TargetError::UnknownArch(s.to_string())),
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl std::str::FromStr for Arch {
  type Err = TargetError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}
