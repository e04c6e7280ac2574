//! # Status Command Implementation
//!
//! Displays one line per registered tree: the checked-out commit, the
//! origin URL, the subject line, and a relative date. Trees that are not
//! materialized yet (or whose checkout is broken) are reported instead of
//! aborting the listing.
//!
//! This command is a safe, read-only operation that does not modify any
//! files.

use std::env;

use anyhow::Result;
use clap::Args;
use console::style;

use unirepo::tree::Tree;
use unirepo::workspace::Workspace;

/// Display the checked-out state of every registered tree
#[derive(Args, Debug)]
pub struct StatusArgs {}

/// Execute the `status` command.
pub fn execute(_args: StatusArgs) -> Result<()> {
    let ws = Workspace::find_from_cwd(&env::current_dir()?)?;
    for tree in ws.all_trees() {
        let path = tree.path_in_workspace(&ws);
        let url = tree.origin_url().unwrap_or("(workspace root)");
        let option_args = vec![
            format!("--format=%H : {} : %s (%cd)", url),
            "--date=relative".to_string(),
            "--no-patch".to_string(),
        ];
        match ws.git().show(&path, "HEAD", &option_args) {
            Ok(line) => println!("{}", line),
            Err(_) => println!(
                "{}",
                style(format!("{} : not checked out", tree.tree_id())).dim()
            ),
        }
    }
    Ok(())
}
