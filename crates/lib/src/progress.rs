//! Classification of raw tool output lines into progress and error signals.
//!
//! The publish toolchain emits no structured progress, so completion is
//! inferred by matching each output line against marker tables. Error
//! markers always win over progress markers; a line matching several
//! progress markers reports the highest percentage among them.

use regex::Regex;
use thiserror::Error;

/// Progress markers for the publish toolchain, in authored order.
///
/// Percentages describe how far through a full restore/build/publish
/// cycle the matching phase typically is. The classifier treats them as
/// an unordered candidate set and picks the maximum match per line.
const DOTNET_PROGRESS_MARKERS: &[(&str, u8)] = &[
  (r"Determining projects to restore", 2),
  (r"Restored\s+[\w\s/]+?packages", 5),
  (r"Restored\s+[\w\s/]+?\.csproj", 8),
  (r"Build started", 10),
  (r"Compiling\s+[\w\s/]+?\.cs", 12),
  (r"CoreGenerateAssemblyInfo", 14),
  (r"GenerateTargetFrameworkMonikerAttribute", 15),
  (r"CoreCompile target", 18),
  (r"Csc target", 20),
  (r"_InitializeSourceControlInformation", 22),
  (r"GetCopyToOutputDirectoryItems", 25),
  (r"_CopySourceItemsToOutputDirectory", 28),
  (r"CopyFilesToOutputDirectory", 30),
  (r"Build succeeded", 35),
  (r"_InitializeIlcParameters", 38),
  (r"_WriteIlcRspFile", 40),
  (r"IlcCompile target", 42),
  (r"_LinkNative target", 45),
  (r"_CreateIlcDirectory", 48),
  (r"ComputeResolvedFilesToPublishList", 50),
  (r"CopyFilesToPublishDirectory", 52),
  (r"_CopyResolvedFilesToPublishLocal", 55),
  (r"_CopyResolvedFilesToPublishPreserveNewest", 58),
  (r"_DeploymentUnpublishable", 60),
  (r"GenerateNativeImages", 65),
  (r"Optimizing assemblies", 68),
  (r"RunNgeni target", 70),
  (r"ComputeIlToNativePaths", 72),
  (r"_StartupTracker", 75),
  (r"_ResolveCompileToolPaths", 78),
  (r"_ComputeIncrementalInputs", 80),
  (r"_GenerateCrossgenProfilingSymbols", 82),
  (r"_PublishBuildAlternative", 85),
  (r"_PublishNativeImages", 88),
  (r"_GenerateBundle", 90),
  (r"_CreateAppHost", 92),
  (r"Published\s+[\w\s/]+?\.csproj", 95),
  (r"Generating native code", 97),
  (r"Linking native binary", 98),
];

/// Error markers for the publish toolchain.
///
/// A match flags the line as an error for reporting; it never decides the
/// attempt's outcome, the exit code does.
const DOTNET_ERROR_MARKERS: &[&str] = &[
  r"Build FAILED",
  r"Error\s+[A-Z]+\d+",
  r"Could not find a part of the path",
  r"The system cannot find the path specified",
  r"EXEC : error",
  r"ILCompiler error",
  r"Native linking error",
  r"AOT Compilation failed",
  r"Compilation failed for",
  r"MSB\d+",
  r"NETSDK\d+",
  r"Exception during compilation:",
];

/// Marker table failed to compile.
#[derive(Debug, Error)]
#[error("invalid marker pattern {pattern}: {source}")]
pub struct MarkerError {
  pub pattern: String,
  source: regex::Error,
}

/// Classification outcome for one output line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
  /// The line matched an error marker.
  Error,
  /// Maximum percentage among the progress markers matching the line.
  Percent(u8),
  /// Nothing recognized.
  NoSignal,
}

/// Compiled marker tables for one toolchain.
pub struct Classifier {
  progress: Vec<(Regex, u8)>,
  errors: Vec<Regex>,
}

impl Classifier {
  /// Compile custom marker tables.
  ///
  /// Patterns are matched case-insensitively anywhere in the line.
  pub fn new(progress: &[(&str, u8)], errors: &[&str]) -> Result<Self, MarkerError> {
    let compile = |pattern: &str| {
      Regex::new(&format!("(?i){pattern}")).map_err(|source| MarkerError {
        pattern: pattern.to_string(),
        source,
      })
    };

    Ok(Self {
      progress: progress
        .iter()
        .map(|&(pattern, percent)| Ok((compile(pattern)?, percent)))
        .collect::<Result<_, MarkerError>>()?,
      errors: errors.iter().map(|&pattern| compile(pattern)).collect::<Result<_, MarkerError>>()?,
    })
  }

  /// Marker tables for the dotnet publish toolchain
  pub fn dotnet() -> Self {
    Self::new(DOTNET_PROGRESS_MARKERS, DOTNET_ERROR_MARKERS).expect("builtin dotnet markers compile")
  }

  /// Classify one raw output line.
  ///
  /// Error markers take priority: a line matching both an error and a
  /// progress marker is an error, never a percentage.
  pub fn classify(&self, line: &str) -> LineClass {
    if self.errors.iter().any(|marker| marker.is_match(line)) {
      return LineClass::Error;
    }

    self
      .progress
      .iter()
      .filter(|(marker, _)| marker.is_match(line))
      .map(|&(_, percent)| percent)
      .max()
      .map_or(LineClass::NoSignal, LineClass::Percent)
  }
}

impl Default for Classifier {
  fn default() -> Self {
    Self::dotnet()
  }
}
