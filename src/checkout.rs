//! # Checkout Orchestration
//!
//! The recursive worklist that, given a starting tree, clones or refreshes
//! it and transitively every reachable dependency exactly once each.
//!
//! The walk is breadth-expanding but not strictly breadth-first: each pass
//! processes whatever trees are newly known, so a deep tree discovered
//! early can be visited before a shallow one discovered late. Termination
//! is guaranteed because the processed set only grows and revisits are
//! skipped.
//!
//! Per-dependency failures are collected, not propagated: one broken
//! optional dependency never blocks an otherwise-working workspace. Only a
//! failure on the directly-requested tree aborts the walk.

use std::collections::HashSet;
use std::path::Path;

use log::{info, warn};

use crate::error::Result;
use crate::tree::{Tree, TreeHandle};
use crate::workspace::Workspace;

/// Outcome of a recursive checkout walk.
#[derive(Debug)]
pub struct CheckoutReport {
    /// Total number of trees processed (including the starting tree).
    pub processed: usize,
    /// `(tree_id, message)` for every tree whose checkout failed.
    pub errors: Vec<(String, String)>,
}

/// Checks out one tree and exposes it under the all-trees directory.
///
/// The workspace root tree is refreshed but never linked.
fn checkout_one(ws: &Workspace, tree: &TreeHandle) -> Result<()> {
    info!("checking out tree {}", tree.tree_id());
    tree.checkout(ws)?;
    if !tree.is_root() {
        let all_path = ws.all_dir().join(tree.default_alias());
        tree.make_link(ws, &all_path)?;
    }
    Ok(())
}

/// Checks out `start` and, transitively, every dependency reachable from
/// it, each exactly once.
///
/// `link_target` optionally creates an extra link to the starting tree; an
/// existing directory target places the link inside it under the tree's
/// default alias.
pub fn checkout_recursive(
    ws: &Workspace,
    start: &TreeHandle,
    link_target: Option<&Path>,
) -> Result<CheckoutReport> {
    // Failures on the requested tree propagate.
    checkout_one(ws, start)?;

    if let Some(target) = link_target {
        let target = if target.is_dir() && !target.is_symlink() {
            target.join(start.default_alias())
        } else {
            target.to_path_buf()
        };
        start.make_link(ws, &target)?;
    }

    // all_depends is every tree known to need processing; processed only
    // grows, which bounds the walk by the reachable closure.
    let mut all_depends: Vec<TreeHandle> = vec![start.clone()];
    let mut known: HashSet<String> = HashSet::from([start.tree_id()]);
    let mut processed: HashSet<String> = HashSet::from([start.tree_id()]);
    let mut errors: Vec<(String, String)> = Vec::new();

    for dep in start.dependencies(ws) {
        if known.insert(dep.tree_id()) {
            all_depends.push(dep);
        }
    }

    loop {
        let pending: Vec<TreeHandle> = all_depends
            .iter()
            .filter(|tree| !processed.contains(&tree.tree_id()))
            .cloned()
            .collect();
        if pending.is_empty() {
            break;
        }
        for tree in pending {
            processed.insert(tree.tree_id());
            if let Err(err) = checkout_one(ws, &tree) {
                warn!("checkout of {} failed: {}", tree.tree_id(), err);
                errors.push((tree.tree_id(), err.to_string()));
            }
            // Dependencies are collected on success or failure; a failed
            // tree may still declare resolvable dependencies.
            for dep in tree.dependencies(ws) {
                if known.insert(dep.tree_id()) {
                    all_depends.push(dep);
                }
            }
        }
    }

    Ok(CheckoutReport {
        processed: all_depends.len(),
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsutil;
    use crate::testutil::MockGit;
    use std::fs;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn mock_workspace(dir: &TempDir) -> (Workspace, Rc<MockGit>) {
        Workspace::init(dir.path()).unwrap();
        let mock = Rc::new(MockGit::default());
        let ws = Workspace::with_git(dir.path(), Box::new(Rc::clone(&mock))).unwrap();
        (ws, mock)
    }

    /// Builds the shared-dependency diamond: a -> {b, c}, b -> d, c -> d.
    fn diamond(ws: &Workspace, mock: &MockGit) -> TreeHandle {
        let a = ws.get_tree("https://h/a.git").unwrap();
        let b = ws.get_tree("https://h/b.git").unwrap();
        let c = ws.get_tree("https://h/c.git").unwrap();
        let a_path = a.path_in_workspace(ws);
        let b_path = b.path_in_workspace(ws);
        let c_path = c.path_in_workspace(ws);
        mock.add_submodule(&a_path, "https://h/b.git", "deps/b");
        mock.add_submodule(&a_path, "https://h/c.git", "deps/c");
        mock.add_submodule(&b_path, "https://h/d.git", "deps/d");
        mock.add_submodule(&c_path, "https://h/d.git", "deps/d");
        a
    }

    #[test]
    fn test_walk_visits_each_tree_exactly_once() {
        let dir = TempDir::new().unwrap();
        let (ws, mock) = mock_workspace(&dir);
        let a = diamond(&ws, &mock);

        let report = checkout_recursive(&ws, &a, None).unwrap();

        assert_eq!(report.processed, 4);
        assert!(report.errors.is_empty());
        // Each tree cloned exactly once, despite d being reachable twice.
        let clones = mock.clone_calls.borrow();
        assert_eq!(
            *clones,
            vec![
                "https://h/a.git",
                "https://h/b.git",
                "https://h/c.git",
                "https://h/d.git",
            ]
        );
    }

    #[test]
    fn test_walk_creates_all_links() {
        let dir = TempDir::new().unwrap();
        let (ws, mock) = mock_workspace(&dir);
        let a = diamond(&ws, &mock);

        checkout_recursive(&ws, &a, None).unwrap();

        for alias in ["a", "b", "c", "d"] {
            let link = ws.all_dir().join(alias);
            assert!(link.is_symlink(), "missing all/ link for {}", alias);
        }
        let a_path = a.path_in_workspace(&ws);
        assert!(fsutil::is_same_path(&ws.all_dir().join("a"), &a_path));
    }

    #[test]
    fn test_walk_links_submodule_paths() {
        let dir = TempDir::new().unwrap();
        let (ws, mock) = mock_workspace(&dir);
        let a = diamond(&ws, &mock);

        checkout_recursive(&ws, &a, None).unwrap();

        let a_path = a.path_in_workspace(&ws);
        let b_path = ws
            .tree_from_spec("b")
            .unwrap()
            .path_in_workspace(&ws);
        assert!(fsutil::is_same_path(&a_path.join("deps/b"), &b_path));
        // And the submodule paths were excluded from git's own bookkeeping.
        let skips = mock.skip_worktree_calls.borrow();
        assert!(skips.contains(&(a_path.clone(), "deps/b".to_string())));
        assert!(skips.contains(&(a_path, "deps/c".to_string())));
    }

    #[test]
    fn test_walk_continues_past_failed_dependency() {
        let dir = TempDir::new().unwrap();
        let (ws, mock) = mock_workspace(&dir);
        let a = diamond(&ws, &mock);
        mock.fail_clones
            .borrow_mut()
            .insert("https://h/b.git".to_string());

        let report = checkout_recursive(&ws, &a, None).unwrap();

        assert_eq!(report.processed, 4);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, "git/https://h/b.git");
        // c and d still materialized.
        let clones = mock.clone_calls.borrow();
        assert!(clones.contains(&"https://h/d.git".to_string()));
        assert!(ws.all_dir().join("c").is_symlink());
    }

    #[test]
    fn test_start_tree_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let (ws, mock) = mock_workspace(&dir);
        let a = ws.get_tree("https://h/a.git").unwrap();
        mock.fail_clones
            .borrow_mut()
            .insert("https://h/a.git".to_string());

        assert!(checkout_recursive(&ws, &a, None).is_err());
    }

    #[test]
    fn test_recheckout_skips_clone_but_reinitializes() {
        let dir = TempDir::new().unwrap();
        let (ws, mock) = mock_workspace(&dir);
        let a = diamond(&ws, &mock);

        checkout_recursive(&ws, &a, None).unwrap();
        let clones_after_first = mock.clone_calls.borrow().len();

        // Second run: everything is already a repository, so no clones, but
        // submodule bookkeeping is refreshed again.
        let skips_before = mock.skip_worktree_calls.borrow().len();
        let report = checkout_recursive(&ws, &a, None).unwrap();
        assert!(report.errors.is_empty());
        assert_eq!(mock.clone_calls.borrow().len(), clones_after_first);
        assert!(mock.skip_worktree_calls.borrow().len() > skips_before);
    }

    #[test]
    fn test_link_target_into_existing_directory() {
        let dir = TempDir::new().unwrap();
        let (ws, mock) = mock_workspace(&dir);
        let a = diamond(&ws, &mock);
        let target_dir = ws.root().join("projects");
        fs::create_dir_all(&target_dir).unwrap();

        checkout_recursive(&ws, &a, Some(&target_dir)).unwrap();

        // The link landed *inside* the directory, under the default alias.
        assert!(target_dir.join("a").is_symlink());
    }

    #[test]
    fn test_link_target_fresh_path() {
        let dir = TempDir::new().unwrap();
        let (ws, mock) = mock_workspace(&dir);
        let a = diamond(&ws, &mock);
        let target = ws.root().join("my-a");

        checkout_recursive(&ws, &a, Some(&target)).unwrap();

        assert!(target.is_symlink());
        assert!(fsutil::is_same_path(&target, &a.path_in_workspace(&ws)));
    }

    #[test]
    fn test_root_tree_walk_links_dependencies_but_not_root() {
        let dir = TempDir::new().unwrap();
        let (ws, mock) = mock_workspace(&dir);
        let root = ws.root_tree().unwrap();
        mock.add_submodule(ws.root(), "https://h/dep.git", "deps/dep");

        let report = checkout_recursive(&ws, &root, None).unwrap();

        assert_eq!(report.processed, 2);
        assert!(ws.all_dir().join("dep").is_symlink());
        // The root tree itself is never linked.
        assert!(!ws.all_dir().join("__root__").exists());
    }

    #[test]
    fn test_unresolvable_dependency_is_skipped() {
        let dir = TempDir::new().unwrap();
        let (ws, mock) = mock_workspace(&dir);
        let a = ws.get_tree("https://h/a.git").unwrap();
        let a_path = a.path_in_workspace(&ws);
        mock.add_submodule(&a_path, "ftp://bad/scheme", "deps/bad");
        mock.add_submodule(&a_path, "https://h/good.git", "deps/good");

        let report = checkout_recursive(&ws, &a, None).unwrap();

        // The unresolvable URL never became a tree; the good one did.
        assert_eq!(report.processed, 2);
        assert!(report.errors.is_empty());
        assert!(ws.all_dir().join("good").is_symlink());
    }
}
