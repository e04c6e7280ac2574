//! # Version Control Client
//!
//! This module wraps every interaction with the external `git` tool behind
//! the [`GitOperations`] trait. The engine never links a VCS library; all
//! operations are synchronous invocations of the system `git` command, which
//! automatically handles:
//!
//! - SSH keys from `~/.ssh/`
//! - Git credential helpers and personal access tokens
//! - Any authentication configured in `~/.gitconfig`
//!
//! The trait seam exists so the worklist algorithms can be driven by mock
//! implementations in tests without touching the network or a real
//! repository. [`SystemGit`] is the production implementation.
//!
//! Every shell-out logs the command line and working directory before
//! executing, and a non-zero exit is translated into
//! [`Error::GitCommand`](crate::error::Error::GitCommand) carrying both for
//! diagnosis.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

use crate::error::{Error, Result};

/// A submodule declaration as read from `.gitmodules`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmoduleInfo {
    pub url: String,
    pub path: String,
}

/// Trait for git operations - allows mocking in tests
pub trait GitOperations {
    /// Returns whether the given path appears to be a git repository.
    fn is_repository(&self, path: &Path) -> bool;

    /// Finds the containing git top-level directory for the given directory.
    fn find_toplevel(&self, cwd: &Path) -> Result<PathBuf>;

    /// Clones `url` into `dest`. Fails if `dest` already exists.
    ///
    /// `extra_args` are passed through to `git clone` verbatim (e.g.
    /// `--reference <path>` to share objects with a sibling workspace).
    fn clone_tree(&self, url: &str, dest: &Path, extra_args: &[String]) -> Result<()>;

    /// Checks out a version in an existing repository, optionally fetching
    /// first. Fails if the working tree is dirty.
    fn checkout_version(&self, path: &Path, version: &str, fetch: bool) -> Result<()>;

    /// Lists the refs advertised by a remote, as `ref name -> commit id`.
    fn list_remote_refs(&self, url: &str) -> Result<BTreeMap<String, String>>;

    /// Parses the `.gitmodules` declarations for a repository. An absent
    /// file yields an empty list.
    fn parse_submodule_declarations(&self, path: &Path) -> Result<Vec<SubmoduleInfo>>;

    /// Parses the currently-pinned submodule versions, as an ordered list of
    /// `(path, version)`.
    fn parse_submodule_pinned_versions(&self, path: &Path) -> Result<Vec<(String, String)>>;

    /// Marks a path in the repository index with `--skip-worktree`.
    fn mark_skip_worktree(&self, path: &Path, subpath: &str) -> Result<()>;

    /// Runs `git show` for an object with extra formatting arguments and
    /// returns the captured output.
    fn show(&self, path: &Path, git_object: &str, option_args: &[String]) -> Result<String>;
}

/// The production [`GitOperations`] implementation, shelling out to the
/// system `git` command.
pub struct SystemGit;

impl SystemGit {
    pub fn new() -> Self {
        SystemGit
    }
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes a git command in `cwd`.
///
/// With `capture`, stdout is collected and returned; otherwise the child
/// inherits our stdio so clone/fetch progress stays visible to the user.
fn execute(args: &[&str], cwd: &Path, capture: bool) -> Result<String> {
    let command_line = args.join(" ");
    if capture {
        debug!("+ {} [from {}]", command_line, cwd.display());
        let output = Command::new(args[0])
            .args(&args[1..])
            .current_dir(cwd)
            .output()
            .map_err(|e| Error::GitCommand {
                command: command_line.clone(),
                dir: cwd.to_path_buf(),
                stderr: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(Error::GitCommand {
                command: command_line,
                dir: cwd.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        info!("+ {} [from {}]", command_line, cwd.display());
        let status = Command::new(args[0])
            .args(&args[1..])
            .current_dir(cwd)
            .status()
            .map_err(|e| Error::GitCommand {
                command: command_line.clone(),
                dir: cwd.to_path_buf(),
                stderr: e.to_string(),
            })?;
        if !status.success() {
            return Err(Error::GitCommand {
                command: command_line,
                dir: cwd.to_path_buf(),
                stderr: format!("exit status {}", status),
            });
        }
        Ok(String::new())
    }
}

impl GitOperations for SystemGit {
    fn is_repository(&self, path: &Path) -> bool {
        if !path.join(".git").is_dir() {
            return false;
        }
        self.find_toplevel(path).is_ok()
    }

    fn find_toplevel(&self, cwd: &Path) -> Result<PathBuf> {
        let out = execute(&["git", "rev-parse", "--show-toplevel"], cwd, true)?;
        Ok(PathBuf::from(out.trim()))
    }

    fn clone_tree(&self, url: &str, dest: &Path, extra_args: &[String]) -> Result<()> {
        if dest.exists() {
            return Err(Error::CloneConflict {
                dest: dest.to_path_buf(),
            });
        }
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        let dest_str = dest.to_string_lossy().into_owned();
        let mut args = vec!["git", "clone"];
        for extra in extra_args {
            args.push(extra);
        }
        args.push(url);
        args.push(&dest_str);
        execute(&args, parent, false)?;
        Ok(())
    }

    fn checkout_version(&self, path: &Path, version: &str, fetch: bool) -> Result<()> {
        if fetch {
            execute(&["git", "fetch"], path, false)?;
        }
        execute(&["git", "checkout", version], path, false)?;
        Ok(())
    }

    fn list_remote_refs(&self, url: &str) -> Result<BTreeMap<String, String>> {
        let out = execute(&["git", "ls-remote", url], Path::new("."), true)?;
        Ok(parse_ls_remote(&out))
    }

    fn parse_submodule_declarations(&self, path: &Path) -> Result<Vec<SubmoduleInfo>> {
        if !path.join(".gitmodules").is_file() {
            return Ok(Vec::new());
        }
        let out = execute(&["git", "config", "-f", ".gitmodules", "-l"], path, true)?;
        Ok(parse_gitmodules_config(&out))
    }

    fn parse_submodule_pinned_versions(&self, path: &Path) -> Result<Vec<(String, String)>> {
        let out = execute(&["git", "submodule", "status"], path, true)?;
        Ok(parse_submodule_status(&out))
    }

    fn mark_skip_worktree(&self, path: &Path, subpath: &str) -> Result<()> {
        execute(
            &["git", "update-index", "--skip-worktree", subpath],
            path,
            false,
        )?;
        Ok(())
    }

    fn show(&self, path: &Path, git_object: &str, option_args: &[String]) -> Result<String> {
        let mut args = vec!["git", "show", git_object];
        for opt in option_args {
            args.push(opt);
        }
        let out = execute(&args, path, true)?;
        Ok(out.trim().to_string())
    }
}

/// Parses `git ls-remote` output into a `ref name -> commit id` mapping.
fn parse_ls_remote(output: &str) -> BTreeMap<String, String> {
    let mut refs = BTreeMap::new();
    for line in output.lines() {
        if let Some((commit, ref_name)) = line.split_once('\t') {
            refs.insert(ref_name.trim().to_string(), commit.trim().to_string());
        }
    }
    refs
}

/// Parses `git config -f .gitmodules -l` output into submodule declarations.
///
/// Keys are of the form `submodule.<name>.path` / `submodule.<name>.url`;
/// declarations without both keys are dropped. Order follows the `.path`
/// keys, which follow the file.
fn parse_gitmodules_config(output: &str) -> Vec<SubmoduleInfo> {
    let mut props: BTreeMap<&str, &str> = BTreeMap::new();
    let mut path_key_order: Vec<&str> = Vec::new();
    for line in output.lines() {
        if let Some((key, value)) = line.split_once('=') {
            if key.ends_with(".path") {
                path_key_order.push(key);
            }
            props.insert(key, value);
        }
    }

    let mut modules = Vec::new();
    for path_key in path_key_order {
        let prefix = &path_key[..path_key.len() - ".path".len()];
        let url_key = format!("{}.url", prefix);
        if let (Some(path), Some(url)) = (props.get(path_key), props.get(url_key.as_str())) {
            modules.push(SubmoduleInfo {
                url: url.to_string(),
                path: path.to_string(),
            });
        }
    }
    modules
}

/// Parses `git submodule status` output into ordered `(path, version)` pairs.
///
/// Works for uninitialized submodules too (the leading status character is
/// stripped). A trailing `(describe)` column, present for initialized
/// submodules, is ignored.
fn parse_submodule_status(output: &str) -> Vec<(String, String)> {
    let mut results = Vec::new();
    for line in output.lines() {
        let line = line.trim().trim_start_matches(['-', '+', 'U']);
        let mut fields = line.split_whitespace();
        if let (Some(version), Some(path)) = (fields.next(), fields.next()) {
            results.push((path.to_string(), version.to_string()));
        }
    }
    results
}
