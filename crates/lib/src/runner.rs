//! Publish tool process execution and output pumping.
//!
//! One build spawns one tool process with both output streams piped. A
//! reader task per stream pushes lines into a single channel; the channel
//! closes only once both streams hit end-of-file, so consumers drain
//! every line even when the process has already exited.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::{BuildSettings, Project};
use crate::platform::Target;

/// Errors raised while driving the external tool.
#[derive(Debug, Error)]
pub enum RunnerError {
  /// The tool executable could not be launched at all.
  ///
  /// Distinct from a nonzero exit code: the tool never ran.
  #[error("failed to launch {program}: {source}")]
  Spawn { program: String, source: std::io::Error },

  /// Waiting on a launched tool failed.
  #[error("failed to wait for {program}: {source}")]
  Wait { program: String, source: std::io::Error },
}

/// Which stream a pumped line arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
  Stdout,
  Stderr,
}

/// One line of tool output, tagged with its stream of origin.
#[derive(Debug, Clone)]
pub struct OutputLine {
  pub source: StreamSource,
  pub text: String,
}

/// Fully-specified invocation of the external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: Option<PathBuf>,
}

impl ToolCommand {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: None,
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }
}

/// Compose the publish invocation for one target.
///
/// The argument vector is fixed so invocations are reproducible run to
/// run: project file, configuration, runtime identifier, output path,
/// runtime bundling, then single-file packaging and symbol stripping.
pub fn publish_command(project: &Project, settings: &BuildSettings, target: Target, out_dir: &Path) -> ToolCommand {
  ToolCommand::new(&project.tool)
    .arg("publish")
    .arg(project.project_file.display().to_string())
    .arg("-c")
    .arg(settings.configuration.as_str())
    .arg("-r")
    .arg(target.rid())
    .arg("-o")
    .arg(out_dir.display().to_string())
    .arg(if settings.standalone { "--self-contained" } else { "--no-self-contained" })
    .arg("/p:PublishSingleFile=true")
    .arg("/p:EnableCompressionInSingleFile=true")
    .arg("/p:DebugType=None")
    .arg("/p:DebugSymbols=false")
    .cwd(&project.root)
}

/// A launched tool with both output streams pumped into one line channel.
pub struct RunningTool {
  program: String,
  child: Child,
  lines: mpsc::UnboundedReceiver<OutputLine>,
}

impl RunningTool {
  /// Launch the tool with piped stdout/stderr and start both pumps
  pub fn spawn(cmd: &ToolCommand) -> Result<Self, RunnerError> {
    let mut command = Command::new(&cmd.program);
    command
      .args(&cmd.args)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    if let Some(dir) = &cmd.cwd {
      command.current_dir(dir);
    }

    debug!(program = %cmd.program, args = ?cmd.args, "spawning tool");

    let mut child = command.spawn().map_err(|source| RunnerError::Spawn {
      program: cmd.program.clone(),
      source,
    })?;

    let (tx, lines) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
      tokio::spawn(pump_stream(stdout, StreamSource::Stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
      tokio::spawn(pump_stream(stderr, StreamSource::Stderr, tx));
    }

    Ok(Self {
      program: cmd.program.clone(),
      child,
      lines,
    })
  }

  /// Next pumped line, in arrival order.
  ///
  /// Returns `None` only after both streams reached end-of-file and every
  /// queued line was consumed; process exit alone does not end the line
  /// stream.
  pub async fn next_line(&mut self) -> Option<OutputLine> {
    self.lines.recv().await
  }

  /// Block until the tool exits and report its status.
  ///
  /// Call after [`next_line`](Self::next_line) returns `None` so no
  /// output is left behind.
  pub async fn wait(mut self) -> Result<ExitStatus, RunnerError> {
    self.child.wait().await.map_err(|source| RunnerError::Wait {
      program: self.program.clone(),
      source,
    })
  }
}

/// Read one stream to end-of-file, forwarding each line.
///
/// The sender is dropped on return, which is what lets the consumer side
/// observe completion.
async fn pump_stream<R>(stream: R, source: StreamSource, tx: mpsc::UnboundedSender<OutputLine>)
where
  R: AsyncRead + Unpin,
{
  let mut lines = BufReader::new(stream).lines();
  loop {
    match lines.next_line().await {
      Ok(Some(text)) => {
        if tx.send(OutputLine { source, text }).is_err() {
          break;
        }
      }
      Ok(None) => break,
      Err(err) => {
        debug!(?source, error = %err, "output stream ended early");
        break;
      }
    }
  }
}
