//! # Focus Command Implementation
//!
//! Focuses on the current tree: every dependency in its cone is set to the
//! most authoritative version, based on proximity to this root. The current
//! tree's own declared dependency versions seed the worklist, and versions
//! propagate depthwise with first-writer-wins priority.

use std::env;

use anyhow::Result;
use clap::Args;
use console::style;

use unirepo::provider::DependencyProvider;
use unirepo::tree::Tree;
use unirepo::version_map::apply_pins;
use unirepo::workspace::Workspace;

/// Set the dependency cone of the current tree to its declared versions
#[derive(Args, Debug)]
pub struct FocusArgs {
    /// Do not fetch prior to checking out
    #[arg(long)]
    pub no_fetch: bool,
}

/// Execute the `focus` command.
pub fn execute(args: FocusArgs) -> Result<()> {
    let cwd = env::current_dir()?;
    let ws = Workspace::find_from_cwd(&cwd)?;
    let tree = ws.tree_from_cwd(&cwd)?;

    let mut seeds = Vec::new();
    for provider in tree.dependency_providers(&ws)? {
        seeds.extend(provider.lookup_versions(&ws)?);
    }
    if seeds.is_empty() {
        println!("Tree {} has no declared dependencies", tree.tree_id());
        return Ok(());
    }

    let report = apply_pins(&ws, seeds, !args.no_fetch)?;
    for (tree_id, version) in &report.updated {
        println!("Updated {} to {}", tree_id, version);
    }
    for (tree_id, message) in &report.errors {
        println!("{} {}: {}", style("!!").red(), tree_id, message);
    }
    Ok(())
}
