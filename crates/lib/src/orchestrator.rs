//! Per-target build pipeline and matrix driver.
//!
//! One attempt runs the full pipeline for one target: clear the output
//! directory, drive the publish tool, classify its output, package on
//! success, persist the log. The matrix driver runs attempts in order
//! and always produces exactly one result per requested target; a
//! failing target never aborts the rest.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::fs;
use tracing::{info, warn};

use crate::config::{BuildSettings, Configuration, Project};
use crate::logs;
use crate::package;
use crate::platform::Target;
use crate::progress::{Classifier, LineClass};
use crate::report::{NoopReport, ProgressReport};
use crate::runner::{self, RunnerError, RunningTool};

/// Errors that can interrupt a single attempt.
///
/// Every variant is caught at the matrix boundary and converted into a
/// failed [`BuildResult`]; nothing here propagates past one target.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
  #[error(transparent)]
  Runner(#[from] RunnerError),

  #[error("failed to prepare output directory {path}: {source}")]
  PrepareOutput { path: PathBuf, source: std::io::Error },
}

/// Packaging outcome attached to a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "detail")]
pub enum PackageStatus {
  /// Build failed, packaging never ran.
  NotAttempted,
  /// Archive written at the given path.
  Archived(PathBuf),
  /// Build succeeded but packaging failed. The build's success stands;
  /// the failure is surfaced here instead of being swallowed.
  Failed(String),
}

/// Outcome of one attempt for one target.
#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
  pub target: Target,
  pub configuration: Configuration,
  /// Decided solely by the tool's exit code (or failure to run it).
  pub success: bool,
  /// Every observed output line, in arrival order.
  pub output: String,
  pub finished_at: DateTime<Local>,
  pub package: PackageStatus,
  /// Path of the persisted log, when writing it succeeded.
  pub log_file: Option<PathBuf>,
}

/// Mutable state accumulated while one attempt runs.
///
/// Owned exclusively by that attempt and dropped once its result exists,
/// so nothing leaks across targets or concurrent runs.
#[derive(Default)]
struct Attempt {
  lines: Vec<String>,
  percent: u8,
}

impl Attempt {
  /// Fold one classified line into the attempt.
  ///
  /// Returns the percentage and error flag to report for the line. The
  /// stored percentage never decreases, and an error outcome leaves it
  /// untouched.
  fn observe(&mut self, class: LineClass) -> (u8, bool) {
    match class {
      LineClass::Error => (self.percent, true),
      LineClass::Percent(percent) => {
        self.percent = self.percent.max(percent);
        (self.percent, false)
      }
      LineClass::NoSignal => (self.percent, false),
    }
  }

  fn output(&self) -> String {
    self.lines.join("\n")
  }
}

/// Drives builds for a project across its target matrix.
pub struct Orchestrator {
  project: Project,
  settings: BuildSettings,
  classifier: Classifier,
  reporter: Box<dyn ProgressReport>,
}

impl Orchestrator {
  pub fn new(project: Project, settings: BuildSettings) -> Self {
    Self {
      project,
      settings,
      classifier: Classifier::dotnet(),
      reporter: Box::new(NoopReport),
    }
  }

  /// Replace the no-op progress handler
  pub fn with_reporter(mut self, reporter: Box<dyn ProgressReport>) -> Self {
    self.reporter = reporter;
    self
  }

  /// Replace the default toolchain marker tables
  pub fn with_classifier(mut self, classifier: Classifier) -> Self {
    self.classifier = classifier;
    self
  }

  /// Build every requested target in order.
  ///
  /// Returns exactly one result per target. Failures are isolated: a
  /// spawn error, nonzero exit, or packaging problem on one target never
  /// prevents the remaining targets from being attempted.
  pub async fn build_matrix(&self, targets: &[Target]) -> Vec<BuildResult> {
    let mut results = Vec::with_capacity(targets.len());
    for &target in targets {
      results.push(self.build_target(target).await);
    }
    results
  }

  /// Run the full pipeline for one target.
  pub async fn build_target(&self, target: Target) -> BuildResult {
    info!(rid = %target.rid(), config = %self.settings.configuration, "building target");

    let mut attempt = Attempt::default();
    let success = match self.run_publish(target, &mut attempt).await {
      Ok(success) => success,
      Err(err) => {
        warn!(rid = %target.rid(), error = %err, "attempt aborted");
        attempt.lines.push(err.to_string());
        false
      }
    };

    let package = if success {
      self.package_target(target, &mut attempt)
    } else {
      PackageStatus::NotAttempted
    };

    let output = attempt.output();
    let log_file = match logs::write_build_log(&self.project.logs_dir, target, success, &output) {
      Ok(path) => Some(path),
      Err(err) => {
        warn!(rid = %target.rid(), error = %err, "failed to persist build log");
        None
      }
    };

    BuildResult {
      target,
      configuration: self.settings.configuration,
      success,
      output,
      finished_at: Local::now(),
      package,
      log_file,
    }
  }

  /// Spawn the tool and drain its output, classifying every line.
  ///
  /// Returns whether the tool exited successfully; the exit code is the
  /// only verdict, error-marker matches along the way are informational.
  async fn run_publish(&self, target: Target, attempt: &mut Attempt) -> Result<bool, BuildError> {
    let out_dir = self.target_output_dir(target);

    // The attempt owns this directory until its result is produced.
    if out_dir.exists() {
      fs::remove_dir_all(&out_dir).await.map_err(|source| BuildError::PrepareOutput {
        path: out_dir.clone(),
        source,
      })?;
    }
    fs::create_dir_all(&out_dir).await.map_err(|source| BuildError::PrepareOutput {
      path: out_dir.clone(),
      source,
    })?;

    let cmd = runner::publish_command(&self.project, &self.settings, target, &out_dir);
    let mut tool = RunningTool::spawn(&cmd)?;

    while let Some(line) = tool.next_line().await {
      let text = line.text.trim().to_string();
      let (percent, is_error) = attempt.observe(self.classifier.classify(&text));
      self.reporter.on_line(&text, percent, is_error);
      attempt.lines.push(text);
    }

    let status = tool.wait().await?;
    info!(rid = %target.rid(), code = ?status.code(), "publish exited");
    Ok(status.success())
  }

  fn package_target(&self, target: Target, attempt: &mut Attempt) -> PackageStatus {
    attempt.percent = attempt.percent.max(95);
    self.reporter.on_line("Creating distribution package...", attempt.percent, false);

    match package::package_build(
      &self.target_output_dir(target),
      &self.project.publish_dir,
      &self.project.name,
      target,
      self.settings.configuration,
    ) {
      Ok(path) => {
        attempt.percent = 100;
        self.reporter.on_line("Build complete", attempt.percent, false);
        PackageStatus::Archived(path)
      }
      Err(err) => {
        warn!(rid = %target.rid(), error = %err, "packaging failed");
        PackageStatus::Failed(err.to_string())
      }
    }
  }

  fn target_output_dir(&self, target: Target) -> PathBuf {
    self.project.publish_dir.join(target.slug())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::progress::Classifier;

  mod attempt {
    use super::*;

    #[test]
    fn percentage_never_decreases() {
      let mut attempt = Attempt::default();
      assert_eq!(attempt.observe(LineClass::Percent(10)), (10, false));
      assert_eq!(attempt.observe(LineClass::Percent(35)), (35, false));
      assert_eq!(attempt.observe(LineClass::Percent(10)), (35, false));
      assert_eq!(attempt.observe(LineClass::NoSignal), (35, false));
    }

    #[test]
    fn error_flags_line_without_touching_percentage() {
      let mut attempt = Attempt::default();
      attempt.observe(LineClass::Percent(35));
      assert_eq!(attempt.observe(LineClass::Error), (35, true));
      assert_eq!(attempt.percent, 35);
    }

    #[test]
    fn output_preserves_arrival_order() {
      let mut attempt = Attempt::default();
      attempt.lines.push("first".to_string());
      attempt.lines.push("second".to_string());
      assert_eq!(attempt.output(), "first\nsecond");
    }
  }

  #[cfg(unix)]
  mod pipeline {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::platform::{Arch, Os};
    use crate::util::testutil;
    use tempfile::TempDir;

    /// Records every callback so tests can assert on the reported stream.
    #[derive(Default)]
    struct RecordingReport(Mutex<Vec<(String, u8, bool)>>);

    impl ProgressReport for RecordingReport {
      fn on_line(&self, line: &str, percent: u8, is_error: bool) {
        self.0.lock().unwrap().push((line.to_string(), percent, is_error));
      }
    }

    fn linux_x64() -> Target {
      Target::new(Os::Linux, Arch::X64).unwrap()
    }

    fn project_with_tool(temp: &TempDir, tool_body: &str) -> Project {
      let root = temp.path().to_path_buf();
      let tool = testutil::fake_tool(&root, tool_body);
      Project {
        name: "proj".to_string(),
        project_file: root.join("proj.csproj"),
        tool: tool.display().to_string(),
        publish_dir: root.join("publish"),
        logs_dir: root.join("build_logs"),
        root,
      }
    }

    fn orchestrator(project: Project) -> (Orchestrator, Arc<RecordingReport>) {
      let report = Arc::new(RecordingReport::default());
      let orchestrator =
        Orchestrator::new(project, BuildSettings::default()).with_reporter(Box::new(Arc::clone(&report)));
      (orchestrator, report)
    }

    #[tokio::test]
    async fn successful_build_is_packaged_and_logged() {
      let temp = TempDir::new().unwrap();
      let project = project_with_tool(
        &temp,
        r#"echo "Determining projects to restore"
echo "Build started"
echo "Build succeeded"
echo "Published proj.csproj""#,
      );
      let publish_dir = project.publish_dir.clone();
      let logs_dir = project.logs_dir.clone();
      let (orchestrator, report) = orchestrator(project);

      let result = orchestrator.build_target(linux_x64()).await;

      assert!(result.success);
      let archive = publish_dir.join("proj-linux-x64-release.tar.gz");
      assert_eq!(result.package, PackageStatus::Archived(archive.clone()));
      assert!(archive.exists());

      let log = result.log_file.expect("log written");
      assert!(log.starts_with(&logs_dir));
      let log_text = std::fs::read_to_string(log).unwrap();
      assert!(log_text.contains("Status: Success"));
      assert!(log_text.contains("Build succeeded"));

      // Reported percentages climb to 95 on publish, then 100 after packaging.
      let calls = report.0.lock().unwrap();
      let percents: Vec<u8> = calls.iter().map(|(_, percent, _)| *percent).collect();
      assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
      assert_eq!(percents.last(), Some(&100));
      assert!(calls.iter().all(|(_, _, is_error)| !is_error));
    }

    #[tokio::test]
    async fn nonzero_exit_fails_without_archive() {
      let temp = TempDir::new().unwrap();
      let project = project_with_tool(
        &temp,
        r#"echo "Build FAILED"
echo "Error CS1009" 1>&2
exit 1"#,
      );
      let publish_dir = project.publish_dir.clone();
      let (orchestrator, report) = orchestrator(project);

      let result = orchestrator.build_target(linux_x64()).await;

      assert!(!result.success);
      assert_eq!(result.package, PackageStatus::NotAttempted);
      assert!(!publish_dir.join("proj-linux-x64-release.tar.gz").exists());
      assert!(result.output.contains("Build FAILED"));
      assert!(result.output.contains("Error CS1009"));

      let log_text = std::fs::read_to_string(result.log_file.unwrap()).unwrap();
      assert!(log_text.contains("Status: Failed"));

      let calls = report.0.lock().unwrap();
      assert!(calls.iter().any(|(_, _, is_error)| *is_error));
    }

    #[tokio::test]
    async fn exit_code_zero_wins_even_without_progress_signal() {
      let temp = TempDir::new().unwrap();
      let project = project_with_tool(&temp, r#"echo "nothing recognizable here""#);
      let (orchestrator, report) = orchestrator(project);

      let result = orchestrator.build_target(linux_x64()).await;

      assert!(result.success);
      // No marker matched, so the percentage stays at 0 until packaging.
      let first = report.0.lock().unwrap().first().cloned().unwrap();
      assert_eq!(first, ("nothing recognizable here".to_string(), 0, false));
    }

    #[tokio::test]
    async fn error_markers_do_not_override_successful_exit() {
      let temp = TempDir::new().unwrap();
      let project = project_with_tool(&temp, r#"echo "Error CS0001 was recovered from""#);
      let (orchestrator, _report) = orchestrator(project);

      let result = orchestrator.build_target(linux_x64()).await;
      assert!(result.success, "exit code is authoritative");
    }

    #[tokio::test]
    async fn spawn_failure_becomes_failed_result_with_log() {
      let temp = TempDir::new().unwrap();
      let root = temp.path().to_path_buf();
      let project = Project {
        name: "proj".to_string(),
        project_file: root.join("proj.csproj"),
        tool: root.join("missing-tool").display().to_string(),
        publish_dir: root.join("publish"),
        logs_dir: root.join("build_logs"),
        root,
      };
      let (orchestrator, _report) = orchestrator(project);

      let result = orchestrator.build_target(linux_x64()).await;

      assert!(!result.success);
      assert!(result.output.contains("failed to launch"));
      assert!(result.log_file.is_some());
      assert_eq!(result.package, PackageStatus::NotAttempted);
    }

    #[tokio::test]
    async fn packaging_failure_keeps_success_but_is_surfaced() {
      let temp = TempDir::new().unwrap();
      let out_dir = temp.path().join("publish/linux-x64");
      // The tool sabotages its own output directory, so the build
      // succeeds but there is nothing left to archive.
      let project = project_with_tool(&temp, &format!("rm -rf '{}'", out_dir.display()));
      let (orchestrator, _report) = orchestrator(project);

      let result = orchestrator.build_target(linux_x64()).await;

      assert!(result.success);
      assert!(matches!(result.package, PackageStatus::Failed(_)));
    }

    #[tokio::test]
    async fn one_failing_target_does_not_stop_the_matrix() {
      let temp = TempDir::new().unwrap();
      // Fails only for the windows RID, which arrives as argument 6.
      let project = project_with_tool(
        &temp,
        r#"case "$6" in win-*) exit 1 ;; *) echo "Build succeeded" ;; esac"#,
      );
      let (orchestrator, _report) = orchestrator(project);

      let targets = [
        Target::new(Os::Windows, Arch::X64).unwrap(),
        Target::new(Os::Linux, Arch::X64).unwrap(),
      ];
      let results = orchestrator.build_matrix(&targets).await;

      assert_eq!(results.len(), 2);
      assert!(!results[0].success);
      assert!(results[1].success);
      assert_eq!(results[1].target, targets[1]);
    }

    #[tokio::test]
    async fn output_directory_is_cleared_between_attempts() {
      let temp = TempDir::new().unwrap();
      let project = project_with_tool(&temp, r#"echo "Build succeeded""#);
      let stale = project.publish_dir.join("linux-x64/stale.dll");
      std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
      std::fs::write(&stale, "old").unwrap();
      let (orchestrator, _report) = orchestrator(project);

      let result = orchestrator.build_target(linux_x64()).await;

      assert!(result.success);
      assert!(!stale.exists(), "previous build output must be cleared");
    }
  }

  #[test]
  fn custom_classifier_is_accepted() {
    let temp = tempfile::TempDir::new().unwrap();
    let root = temp.path().to_path_buf();
    let project = Project {
      name: "proj".to_string(),
      project_file: root.join("proj.csproj"),
      tool: "true".to_string(),
      publish_dir: root.join("publish"),
      logs_dir: root.join("build_logs"),
      root,
    };
    let orchestrator = Orchestrator::new(project, BuildSettings::default())
      .with_classifier(Classifier::new(&[(r"done", 100)], &[]).unwrap());
    assert_eq!(orchestrator.classifier.classify("done"), LineClass::Percent(100));
  }
}
