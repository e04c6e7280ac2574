//! # Fix Command Implementation
//!
//! Fixes trees after repository events. Certain operations (`git pull`,
//! `git reset --hard`, …) can leave tree dependency links in an
//! inconsistent state; this re-runs checkout on the current tree, which
//! refreshes submodule bookkeeping and recreates the links.

use std::env;

use anyhow::Result;
use clap::Args;

use unirepo::tree::Tree;
use unirepo::workspace::Workspace;

/// Repair dependency links of the current tree
#[derive(Args, Debug)]
pub struct FixArgs {}

/// Execute the `fix` command.
pub fn execute(_args: FixArgs) -> Result<()> {
    let cwd = env::current_dir()?;
    let ws = Workspace::find_from_cwd(&cwd)?;
    let tree = ws.tree_from_cwd(&cwd)?;
    tree.checkout(&ws)?;
    println!("Repaired links for {}", tree.tree_id());
    Ok(())
}
