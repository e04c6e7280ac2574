//! # Tree Command Implementation
//!
//! This module implements the `tree` subcommand, which displays the
//! dependency tree of the current tree in a hierarchical format.
//!
//! ## Functionality
//!
//! - **Dependency Tree Visualization**: renders the declared dependency
//!   graph starting at the current tree
//! - **Depth Control**: supports `--depth` to limit tree depth
//! - **Shared Dependencies**: a tree reachable through more than one path
//!   is marked with `*` and not re-expanded
//!
//! This command is a safe, read-only operation that does not modify any
//! files.

use std::collections::HashSet;
use std::env;

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};

use unirepo::tree::{Tree, TreeHandle};
use unirepo::workspace::Workspace;

/// Display the dependency tree of the current tree
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Maximum depth to display in the tree.
    ///
    /// If not specified, displays the full tree. Use 1 to show only the
    /// immediate dependencies.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,
}

/// Execute the `tree` command.
pub fn execute(args: TreeArgs) -> Result<()> {
    let cwd = env::current_dir()?;
    let ws = Workspace::find_from_cwd(&cwd)?;
    let start = ws.tree_from_cwd(&cwd)?;

    let max_depth = args.depth.unwrap_or(usize::MAX);
    let root = build_tree_node(&ws, &start, max_depth, &mut HashSet::new());
    print_tree(&root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;

    Ok(())
}

/// Build a display node from a tree and its declared dependencies.
fn build_tree_node(
    ws: &Workspace,
    tree: &TreeHandle,
    depth_left: usize,
    visited: &mut HashSet<String>,
) -> TreeNode {
    let tree_id = tree.tree_id();
    if !visited.insert(tree_id.clone()) {
        // Already shown on another path; mark and stop expanding.
        return TreeNode {
            label: format!("{} *", tree_id),
            children: vec![],
        };
    }
    if depth_left == 0 {
        return TreeNode {
            label: tree_id,
            children: vec![],
        };
    }
    let children = tree
        .dependencies(ws)
        .iter()
        .map(|dep| build_tree_node(ws, dep, depth_left - 1, visited))
        .collect();
    TreeNode {
        label: tree_id,
        children,
    }
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> std::borrow::Cow<'_, [Self::Child]> {
        std::borrow::Cow::Borrowed(&self.children)
    }
}
