//! # Version-Map Command Implementation
//!
//! Queries or sets a version map.
//!
//! By default, every component of the map is resolved to a concrete
//! revision and the resolved mapping is printed back (suitable for a future
//! call). With `--set`, checked-out revisions are updated as needed.
//!
//! A version map is a whitespace-delimited list of components of the form
//! `tree_id|alias ['@' symbolic_version] ['=' resolved_version]`. The
//! symbolic version is a ref known to the remote (`HEAD`,
//! `refs/heads/main`, …) and the resolved version is a commit hash; with
//! neither given, `HEAD` is assumed.
//!
//! When setting, each listed tree checks out its given version if it has
//! not been encountered yet, then enqueues its own declared dependency
//! versions. Versions are set first-come and proceed depthwise, so
//! specific, deep versions can be pinned by listing or encountering them
//! first.

use std::env;

use anyhow::Result;
use clap::Args;
use console::style;

use unirepo::version_map::{apply_pins, TreeSpec, VersionMap};
use unirepo::workspace::Workspace;

/// Resolve and optionally set a version map
#[derive(Args, Debug)]
pub struct VersionMapArgs {
    /// Set the version map, checking out as needed
    #[arg(long)]
    pub set: bool,

    /// Do not fetch prior to checking out
    #[arg(long)]
    pub no_fetch: bool,

    /// Version specs to apply
    pub specs: Vec<String>,
}

/// Execute the `version-map` command.
pub fn execute(args: VersionMapArgs) -> Result<()> {
    let cwd = env::current_dir()?;
    let ws = Workspace::find_from_cwd(&cwd)?;

    let map = VersionMap::parse(args.specs.iter().map(String::as_str));
    let map = map.resolve(&ws)?;
    println!("{}", map);

    if !args.set {
        return Ok(());
    }

    // A resolved map carries a live tree and a concrete version for every
    // component.
    let mut seeds = Vec::new();
    for component in map.components() {
        if let (TreeSpec::Resolved(tree), Some(version)) =
            (&component.tree, component.resolved_version.clone())
        {
            seeds.push((tree.clone(), version));
        }
    }

    let report = apply_pins(&ws, seeds, !args.no_fetch)?;
    for (tree_id, version) in &report.updated {
        println!(":: Updated {} to {}", tree_id, version);
    }
    for (tree_id, message) in &report.errors {
        println!("{} {}: {}", style("!!").red(), tree_id, message);
    }
    Ok(())
}
