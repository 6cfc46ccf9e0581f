use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;
mod prompts;

/// slipway - matrix build and packaging driver for publish toolchains
#[derive(Parser)]
#[command(name = "slipway")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build and package the project for one or more targets
  Build(cmd::BuildArgs),

  /// List the supported target matrix
  Targets,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();

  match cli.command {
    Commands::Build(args) => cmd::cmd_build(args, cli.verbose),
    Commands::Targets => cmd::cmd_targets(),
  }
}
