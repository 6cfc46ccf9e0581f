//! Artifact packaging for successful builds.
//!
//! Each successful target gets one compressed archive of its publish
//! output directory: zip for Windows targets, tar.gz for the rest.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use thiserror::Error;
use tracing::info;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::config::Configuration;
use crate::platform::{Os, Target};

/// Errors raised while producing an archive.
#[derive(Debug, Error)]
pub enum PackageError {
  /// The build output directory to archive does not exist.
  #[error("build output directory missing: {0}")]
  MissingSource(PathBuf),

  #[error("failed to create archive {path}: {source}")]
  Create { path: PathBuf, source: io::Error },

  #[error("failed to add {path} to archive: {source}")]
  Append { path: PathBuf, source: io::Error },

  #[error("failed to finish archive {path}: {source}")]
  Finish { path: PathBuf, source: io::Error },

  #[error("zip error: {0}")]
  Zip(#[from] zip::result::ZipError),

  #[error("failed to walk build output: {0}")]
  Walk(#[from] walkdir::Error),
}

/// Archive format, chosen by target platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
  Zip,
  TarGz,
}

impl ArchiveKind {
  pub fn for_os(os: Os) -> Self {
    match os {
      Os::Windows => Self::Zip,
      Os::Linux | Os::MacOs => Self::TarGz,
    }
  }

  pub fn extension(self) -> &'static str {
    match self {
      Self::Zip => "zip",
      Self::TarGz => "tar.gz",
    }
  }
}

/// Name stem for a target's distribution archive
pub fn archive_stem(project: &str, target: Target, configuration: Configuration) -> String {
  format!(
    "{}-{}-{}-{}",
    project,
    target.os().name(),
    target.arch(),
    configuration.lower()
  )
}

/// Compress a successful build's output directory into one archive.
///
/// Contents land at the archive root, relative to `source_dir`. Returns
/// the path of the archive written under `dest_dir`.
pub fn package_build(
  source_dir: &Path,
  dest_dir: &Path,
  project: &str,
  target: Target,
  configuration: Configuration,
) -> Result<PathBuf, PackageError> {
  if !source_dir.is_dir() {
    return Err(PackageError::MissingSource(source_dir.to_path_buf()));
  }

  let kind = ArchiveKind::for_os(target.os());
  let path = dest_dir.join(format!(
    "{}.{}",
    archive_stem(project, target, configuration),
    kind.extension()
  ));

  match kind {
    ArchiveKind::Zip => write_zip(source_dir, &path)?,
    ArchiveKind::TarGz => write_tar_gz(source_dir, &path)?,
  }

  info!(archive = %path.display(), "artifact packaged");
  Ok(path)
}

fn write_tar_gz(source: &Path, dest: &Path) -> Result<(), PackageError> {
  let file = File::create(dest).map_err(|source_err| PackageError::Create {
    path: dest.to_path_buf(),
    source: source_err,
  })?;

  let encoder = GzEncoder::new(file, Compression::default());
  let mut builder = tar::Builder::new(encoder);
  builder.append_dir_all(".", source).map_err(|source_err| PackageError::Append {
    path: source.to_path_buf(),
    source: source_err,
  })?;

  let encoder = builder.into_inner().map_err(|source_err| PackageError::Finish {
    path: dest.to_path_buf(),
    source: source_err,
  })?;
  encoder.finish().map_err(|source_err| PackageError::Finish {
    path: dest.to_path_buf(),
    source: source_err,
  })?;

  Ok(())
}

fn write_zip(source: &Path, dest: &Path) -> Result<(), PackageError> {
  let file = File::create(dest).map_err(|source_err| PackageError::Create {
    path: dest.to_path_buf(),
    source: source_err,
  })?;

  let mut writer = ZipWriter::new(file);
  let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

  for entry in WalkDir::new(source) {
    let entry = entry?;
    let Ok(rel) = entry.path().strip_prefix(source) else {
      continue;
    };
    if rel.as_os_str().is_empty() {
      continue;
    }
    // Zip entry names always use forward slashes
    let name = rel.to_string_lossy().replace('\\', "/");

    if entry.file_type().is_dir() {
      writer.add_directory(format!("{name}/"), options)?;
    } else {
      writer.start_file(name, options)?;
      let mut contents = File::open(entry.path()).map_err(|source_err| PackageError::Append {
        path: entry.path().to_path_buf(),
        source: source_err,
      })?;
      io::copy(&mut contents, &mut writer).map_err(|source_err| PackageError::Append {
        path: entry.path().to_path_buf(),
        source: source_err,
      })?;
    }
  }

  writer.finish()?;
  Ok(())
}
