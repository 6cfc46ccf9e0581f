//! Implementation of the `slipway targets` command.

use anyhow::Result;

use slipway_lib::platform;

/// List every supported (os, architecture) pair with its runtime
/// identifier.
pub fn cmd_targets() -> Result<()> {
  for target in platform::matrix() {
    println!("{:<14} rid: {}", target.slug(), target.rid());
  }
  Ok(())
}
