//! # Info Command Implementation
//!
//! This module implements the `info` subcommand, which displays the layout
//! of the current workspace and the number of registered trees.
//!
//! This command is a safe, read-only operation that does not modify any
//! files.

use std::env;

use anyhow::Result;
use clap::Args;

use unirepo::workspace::Workspace;

/// Show information about the current workspace
#[derive(Args, Debug)]
pub struct InfoArgs {}

/// Execute the `info` command.
pub fn execute(_args: InfoArgs) -> Result<()> {
    let ws = Workspace::find_from_cwd(&env::current_dir()?)?;
    println!("top: {}", ws.root().display());
    println!("control: {}", ws.control_dir().display());
    println!("universe: {}", ws.universe_dir().display());
    println!("trees: {}", ws.all_trees().len());
    Ok(())
}
