//! Implementation of the `slipway build` command.
//!
//! Resolves the requested targets, checks the publish tool is available,
//! and drives the orchestrator across the matrix, printing one summary
//! line per target at the end.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use owo_colors::OwoColorize;
use tracing::info;

use slipway_lib::config::{BuildSettings, Configuration, Project};
use slipway_lib::orchestrator::{BuildResult, Orchestrator, PackageStatus};
use slipway_lib::platform::{self, Target};
use slipway_lib::report::ProgressReport;

use crate::output::{self, OutputFormat};
use crate::prompts;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConfigOpt {
  Debug,
  Release,
}

impl From<ConfigOpt> for Configuration {
  fn from(opt: ConfigOpt) -> Self {
    match opt {
      ConfigOpt::Debug => Configuration::Debug,
      ConfigOpt::Release => Configuration::Release,
    }
  }
}

#[derive(Debug, Args)]
pub struct BuildArgs {
  /// Target to build, as <os>-<arch> (repeatable)
  #[arg(short, long = "target", value_name = "OS-ARCH")]
  targets: Vec<String>,

  /// Build every supported target
  #[arg(long, conflicts_with = "targets")]
  all: bool,

  /// Build configuration
  #[arg(short, long, value_enum, default_value_t = ConfigOpt::Release)]
  config: ConfigOpt,

  /// Skip bundling the runtime (framework-dependent build)
  #[arg(long)]
  no_standalone: bool,

  /// Project directory (default: current directory)
  #[arg(long, default_value = ".")]
  project: PathBuf,

  /// Skip the confirmation prompt
  #[arg(short = 'y', long)]
  yes: bool,

  /// Skip the build tool availability check
  #[arg(long)]
  no_preflight: bool,

  /// Output format for the final summary
  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  format: OutputFormat,
}

/// Prints streamed tool output; quiet unless verbose.
struct ConsoleReport {
  verbose: bool,
}

impl ProgressReport for ConsoleReport {
  fn on_line(&self, line: &str, percent: u8, is_error: bool) {
    if is_error {
      output::print_error(&format!("[{percent:>3}%] {line}"));
    } else if self.verbose && !line.is_empty() {
      println!("[{percent:>3}%] {line}");
    }
  }
}

/// Execute the build command.
///
/// Builds and packages every requested target sequentially; a failing
/// target is reported but never stops the rest of the matrix. Exits
/// nonzero if any target failed.
pub fn cmd_build(args: BuildArgs, verbose: bool) -> Result<()> {
  let project = Project::load(&args.project)
    .with_context(|| format!("Failed to load project at {}", args.project.display()))?;

  let targets = resolve_targets(&args)?;
  let settings = BuildSettings {
    configuration: args.config.into(),
    standalone: !args.no_standalone,
  };

  if !args.no_preflight {
    preflight(&project)?;
  }

  if !args.format.is_json() {
    println!("{}", "Build plan:".bold());
    print_plan(&project, &settings, &targets);
  }

  if !prompts::confirm("Start build process?", args.yes)? {
    return Ok(());
  }

  let reporter = ConsoleReport { verbose };
  let orchestrator = Orchestrator::new(project.clone(), settings).with_reporter(Box::new(reporter));

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let started = Instant::now();
  let results = rt.block_on(orchestrator.build_matrix(&targets));
  let elapsed = started.elapsed();
  info!(
    targets = results.len(),
    failed = results.iter().filter(|result| !result.success).count(),
    "matrix complete"
  );

  if args.format.is_json() {
    output::print_json(&results)?;
  } else {
    print_summary(&project, &results, elapsed);
  }

  if results.iter().any(|result| !result.success) {
    std::process::exit(1);
  }
  Ok(())
}

fn resolve_targets(args: &BuildArgs) -> Result<Vec<Target>> {
  if args.all {
    return Ok(platform::matrix());
  }
  if args.targets.is_empty() {
    bail!("no targets requested; pass --target <os>-<arch> or --all");
  }
  args
    .targets
    .iter()
    .map(|raw| {
      raw
        .parse::<Target>()
        .with_context(|| format!("Invalid target: {raw}"))
    })
    .collect()
}

/// Verify the publish tool can be launched at all before touching the
/// matrix, mirroring what a failed spawn would report mid-run.
fn preflight(project: &Project) -> Result<()> {
  let probe = std::process::Command::new(&project.tool).arg("--version").output();
  match probe {
    Ok(out) if out.status.success() => {
      let version = String::from_utf8_lossy(&out.stdout).trim().to_string();
      output::print_info(&format!("{} {}", project.tool, version));
      Ok(())
    }
    Ok(out) => bail!("{} --version exited with {}", project.tool, out.status),
    Err(err) => bail!("{} is not installed or not on PATH: {}", project.tool, err),
  }
}

fn print_plan(project: &Project, settings: &BuildSettings, targets: &[Target]) {
  output::print_stat("Project", &project.name);
  output::print_stat("Configuration", settings.configuration.as_str());
  output::print_stat("Standalone", if settings.standalone { "yes" } else { "no" });
  output::print_stat(
    "Targets",
    &targets.iter().map(Target::to_string).collect::<Vec<_>>().join(", "),
  );
}

fn print_summary(project: &Project, results: &[BuildResult], elapsed: std::time::Duration) {
  println!();
  println!("{}", "Build results:".bold());

  for result in results {
    match (result.success, &result.package) {
      (true, PackageStatus::Archived(path)) => {
        let size = std::fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
        output::print_success(&format!(
          "{}  {} ({})",
          result.target,
          path.file_name().unwrap_or_default().to_string_lossy(),
          output::format_bytes(size)
        ));
      }
      (true, PackageStatus::Failed(detail)) => {
        output::print_warning(&format!("{}  built, but packaging failed: {}", result.target, detail));
      }
      _ => {
        output::print_error(&format!("{}  build failed", result.target));
        if let Some(log) = &result.log_file {
          eprintln!("  see {}", log.display());
        }
        for line in result.output.lines().rev().take(10).collect::<Vec<_>>().into_iter().rev() {
          eprintln!("    {line}");
        }
      }
    }
  }

  println!();
  output::print_stat("Output directory", &project.publish_dir.display().to_string());
  output::print_stat("Build logs", &project.logs_dir.display().to_string());
  output::print_stat("Elapsed", &output::format_duration(elapsed));
}
