//! # Checkout Command Implementation
//!
//! This module implements the `checkout` subcommand.
//!
//! ## Forms
//!
//! ```text
//! unirepo checkout <repository url> [local path]
//! unirepo checkout
//! ```
//!
//! In the first form, a specific repository URL is checked out, optionally
//! linked at a local path. In the second form, the tree mapped to the
//! current working directory is re-checked out; typically it already
//! exists, so the clone is skipped and only dependency links are refreshed.
//! Either way, all reachable dependencies are resolved and materialized,
//! best-effort.

use std::env;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use console::style;

use unirepo::checkout::checkout_recursive;
use unirepo::tree::Tree;
use unirepo::workspace::Workspace;

/// Check out a tree and, recursively, its dependencies
#[derive(Args, Debug)]
pub struct CheckoutArgs {
    /// Repository URL to check out; defaults to the tree containing the
    /// current directory
    pub url: Option<String>,

    /// Extra location to link the checked-out tree at. An existing
    /// directory receives the link inside it, named by the tree's default
    /// alias.
    pub local_path: Option<PathBuf>,
}

/// Execute the `checkout` command.
pub fn execute(args: CheckoutArgs) -> Result<()> {
    let cwd = env::current_dir()?;
    let ws = Workspace::find_from_cwd(&cwd)?;
    let tree = match &args.url {
        Some(url) => ws.get_tree(url)?,
        None => ws.tree_from_cwd(&cwd)?,
    };

    println!("Checking out tree {}", tree.tree_id());
    let report = checkout_recursive(&ws, &tree, args.local_path.as_deref())?;

    println!(
        "{} Processed {} repositories",
        style("**").green(),
        report.processed
    );
    if !report.errors.is_empty() {
        println!(
            "{} {} repositories had errors:",
            style("!!").red(),
            report.errors.len()
        );
        for (tree_id, _) in &report.errors {
            println!("  {}", tree_id);
        }
        println!("{} Error messages:", style("!!").red());
        for (_, message) in &report.errors {
            println!("  {}", message);
        }
    }
    Ok(())
}
