//! # Top Command Implementation
//!
//! Prints the top directory of the current workspace, for use in shell
//! substitutions (`cd $(unirepo top)`).

use std::env;

use anyhow::Result;
use clap::Args;

use unirepo::workspace::Workspace;

/// Print the top directory of the current workspace
#[derive(Args, Debug)]
pub struct TopArgs {}

/// Execute the `top` command.
pub fn execute(_args: TopArgs) -> Result<()> {
    let ws = Workspace::find_from_cwd(&env::current_dir()?)?;
    println!("{}", ws.root().display());
    Ok(())
}
