//! Mock VCS client shared by the engine tests.
//!
//! `MockGit` simulates the external git tool entirely in memory (plus the
//! minimum of real directories so link creation works): configured
//! submodule declarations, pinned versions, and remote refs are served from
//! maps, and every mutating call is recorded for assertions. Cloning a tree
//! creates the destination directory with a `.git` marker so annotations
//! and links behave as they would against a real clone.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::git::{GitOperations, SubmoduleInfo};

#[derive(Default)]
pub(crate) struct MockGit {
    /// Paths that count as existing repositories.
    pub repos: RefCell<HashSet<PathBuf>>,
    /// Submodule declarations per tree path.
    pub submodules: RefCell<HashMap<PathBuf, Vec<SubmoduleInfo>>>,
    /// Pinned `(path, version)` submodule entries per tree path.
    pub pinned: RefCell<HashMap<PathBuf, Vec<(String, String)>>>,
    /// Advertised refs per remote URL.
    pub remote_refs: RefCell<HashMap<String, BTreeMap<String, String>>>,
    /// `cwd -> toplevel` answers for `find_toplevel`.
    pub toplevels: RefCell<HashMap<PathBuf, PathBuf>>,
    /// URLs whose clone fails.
    pub fail_clones: RefCell<HashSet<String>>,
    /// Tree paths whose version update fails.
    pub fail_updates: RefCell<HashSet<PathBuf>>,

    pub clone_calls: RefCell<Vec<String>>,
    pub checkout_calls: RefCell<Vec<(PathBuf, String, bool)>>,
    pub skip_worktree_calls: RefCell<Vec<(PathBuf, String)>>,
}

impl MockGit {
    /// Declares a submodule of the tree at `tree_path`.
    pub fn add_submodule(&self, tree_path: &Path, url: &str, path: &str) {
        self.submodules
            .borrow_mut()
            .entry(tree_path.to_path_buf())
            .or_default()
            .push(SubmoduleInfo {
                url: url.to_string(),
                path: path.to_string(),
            });
    }

    /// Declares a pinned submodule version of the tree at `tree_path`.
    pub fn add_pinned(&self, tree_path: &Path, path: &str, version: &str) {
        self.pinned
            .borrow_mut()
            .entry(tree_path.to_path_buf())
            .or_default()
            .push((path.to_string(), version.to_string()));
    }

    /// Advertises a remote ref for a URL.
    pub fn add_remote_ref(&self, url: &str, ref_name: &str, commit: &str) {
        self.remote_refs
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .insert(ref_name.to_string(), commit.to_string());
    }

    fn command_error(command: &str, dir: &Path, stderr: &str) -> Error {
        Error::GitCommand {
            command: command.to_string(),
            dir: dir.to_path_buf(),
            stderr: stderr.to_string(),
        }
    }
}

impl GitOperations for MockGit {
    fn is_repository(&self, path: &Path) -> bool {
        self.repos.borrow().contains(path)
    }

    fn find_toplevel(&self, cwd: &Path) -> Result<PathBuf> {
        self.toplevels
            .borrow()
            .get(cwd)
            .cloned()
            .ok_or_else(|| Self::command_error("git rev-parse --show-toplevel", cwd, "not a git repository"))
    }

    fn clone_tree(&self, url: &str, dest: &Path, _extra_args: &[String]) -> Result<()> {
        self.clone_calls.borrow_mut().push(url.to_string());
        if self.fail_clones.borrow().contains(url) {
            return Err(Self::command_error(
                &format!("git clone {}", url),
                dest.parent().unwrap_or_else(|| Path::new(".")),
                "mock clone failure",
            ));
        }
        fs::create_dir_all(dest.join(".git"))?;
        self.repos.borrow_mut().insert(dest.to_path_buf());
        Ok(())
    }

    fn checkout_version(&self, path: &Path, version: &str, fetch: bool) -> Result<()> {
        if self.fail_updates.borrow().contains(path) {
            return Err(Self::command_error("git checkout", path, "mock dirty tree"));
        }
        self.checkout_calls
            .borrow_mut()
            .push((path.to_path_buf(), version.to_string(), fetch));
        Ok(())
    }

    fn list_remote_refs(&self, url: &str) -> Result<BTreeMap<String, String>> {
        self.remote_refs
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| {
                Self::command_error(&format!("git ls-remote {}", url), Path::new("."), "unreachable remote")
            })
    }

    fn parse_submodule_declarations(&self, path: &Path) -> Result<Vec<SubmoduleInfo>> {
        Ok(self
            .submodules
            .borrow()
            .get(path)
            .cloned()
            .unwrap_or_default())
    }

    fn parse_submodule_pinned_versions(&self, path: &Path) -> Result<Vec<(String, String)>> {
        Ok(self.pinned.borrow().get(path).cloned().unwrap_or_default())
    }

    fn mark_skip_worktree(&self, path: &Path, subpath: &str) -> Result<()> {
        self.skip_worktree_calls
            .borrow_mut()
            .push((path.to_path_buf(), subpath.to_string()));
        Ok(())
    }

    fn show(&self, _path: &Path, _git_object: &str, _option_args: &[String]) -> Result<String> {
        Ok(String::new())
    }
}

// Tests keep a handle on the mock while the workspace owns the boxed client,
// so the client is usually an `Rc<MockGit>`.
impl GitOperations for Rc<MockGit> {
    fn is_repository(&self, path: &Path) -> bool {
        (**self).is_repository(path)
    }
    fn find_toplevel(&self, cwd: &Path) -> Result<PathBuf> {
        (**self).find_toplevel(cwd)
    }
    fn clone_tree(&self, url: &str, dest: &Path, extra_args: &[String]) -> Result<()> {
        (**self).clone_tree(url, dest, extra_args)
    }
    fn checkout_version(&self, path: &Path, version: &str, fetch: bool) -> Result<()> {
        (**self).checkout_version(path, version, fetch)
    }
    fn list_remote_refs(&self, url: &str) -> Result<BTreeMap<String, String>> {
        (**self).list_remote_refs(url)
    }
    fn parse_submodule_declarations(&self, path: &Path) -> Result<Vec<SubmoduleInfo>> {
        (**self).parse_submodule_declarations(path)
    }
    fn parse_submodule_pinned_versions(&self, path: &Path) -> Result<Vec<(String, String)>> {
        (**self).parse_submodule_pinned_versions(path)
    }
    fn mark_skip_worktree(&self, path: &Path, subpath: &str) -> Result<()> {
        (**self).mark_skip_worktree(path, subpath)
    }
    fn show(&self, path: &Path, git_object: &str, option_args: &[String]) -> Result<String> {
        (**self).show(path, git_object, option_args)
    }
}
