//! # Workspace Persistence
//!
//! JSON-backed persistence for the workspace: the tree registry and alias
//! table (`config/trees.json`), workspace settings (`config/settings.json`),
//! and the per-clone annotation that links a checked-out working tree back
//! to its tree id.
//!
//! ## Registry encoding
//!
//! Tree records are stored as a tagged variant with an explicit `type`
//! discriminant. Only one variant (`git`) exists today, but the encoding is
//! open: future tree kinds add variants without changing the file format of
//! existing entries.
//!
//! ## Annotation placement
//!
//! The annotation file lives inside the clone's `.git` directory (adjacent
//! to, not inside, the tracked working tree) so it survives `git reset
//! --hard` and `git clean` on the checkout.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name of the annotation stored in each clone's `.git` directory.
const ANNOTATION_FILE: &str = "unirepo-tree.json";

/// A persisted tree record, discriminated by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TreeRecord {
    /// A git-backed tree.
    #[serde(rename = "git")]
    Git { url: String, working_tree: String },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TreesData {
    #[serde(default)]
    trees: BTreeMap<String, TreeRecord>,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

/// The tree identity registry: `tree_id -> record` plus the alias table.
///
/// The registry only grows; trees are never garbage-collected.
#[derive(Debug)]
pub struct TreesConfig {
    file: PathBuf,
    data: TreesData,
}

impl TreesConfig {
    /// Loads the registry from `file`, or starts empty if the file does not
    /// exist yet.
    pub fn load(file: PathBuf) -> Result<Self> {
        let data = if file.is_file() {
            read_json(&file)?
        } else {
            TreesData::default()
        };
        Ok(TreesConfig { file, data })
    }

    /// Writes the registry back to disk.
    pub fn save(&self) -> Result<()> {
        debug!("writing tree registry to {}", self.file.display());
        write_json(&self.file, &self.data)
    }

    pub fn record(&self, tree_id: &str) -> Option<&TreeRecord> {
        self.data.trees.get(tree_id)
    }

    pub fn contains(&self, tree_id: &str) -> bool {
        self.data.trees.contains_key(tree_id)
    }

    pub fn insert(&mut self, tree_id: String, record: TreeRecord) {
        self.data.trees.insert(tree_id, record);
    }

    /// All registered tree ids, in stable (sorted) order.
    pub fn tree_ids(&self) -> impl Iterator<Item = &str> {
        self.data.trees.keys().map(String::as_str)
    }

    /// Resolves an alias to the tree id it is bound to.
    pub fn alias_target(&self, alias: &str) -> Option<&str> {
        self.data.aliases.get(alias).map(String::as_str)
    }

    /// Binds `alias` to `tree_id`, de-duplicating on collision.
    ///
    /// Re-adding an existing binding is idempotent. An alias already bound
    /// to a *different* tree keeps its binding; the new tree receives the
    /// first free `alias-N` instead. Returns the alias actually bound.
    pub fn add_alias(&mut self, alias: &str, tree_id: &str) -> String {
        let mut candidate = alias.to_string();
        let mut counter = 0usize;
        loop {
            match self.data.aliases.get(&candidate) {
                Some(existing) if existing == tree_id => return candidate,
                Some(_) => {
                    candidate = format!("{}-{}", alias, counter);
                    counter += 1;
                }
                None => {
                    self.data
                        .aliases
                        .insert(candidate.clone(), tree_id.to_string());
                    return candidate;
                }
            }
        }
    }
}

/// Workspace-level settings, stored as `config/settings.json`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    /// Local repository whose object store is shared with new clones via
    /// `git clone --reference`, to speed up clones of trees previously
    /// materialized in a sibling workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_reference: Option<PathBuf>,
}

impl WorkspaceSettings {
    /// Loads the settings from `file`, defaulting when absent.
    pub fn load(file: &Path) -> Result<Self> {
        if file.is_file() {
            read_json(file)
        } else {
            Ok(WorkspaceSettings::default())
        }
    }

    #[allow(dead_code)]
    pub fn save(&self, file: &Path) -> Result<()> {
        write_json(file, self)
    }
}

/// An annotation stored in a clone's `.git` directory linking it back to the
/// workspace registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitAnnotation {
    pub tree_id: String,
}

impl GitAnnotation {
    /// Reads the annotation for the working tree rooted at `git_root`.
    pub fn from_git_root(git_root: &Path) -> Result<GitAnnotation> {
        let path = git_root.join(".git").join(ANNOTATION_FILE);
        if !path.is_file() {
            return Err(Error::UntrackedCheckout {
                path: git_root.to_path_buf(),
            });
        }
        read_json(&path)
    }

    /// Writes the annotation for the working tree rooted at `git_root`.
    pub fn save_to_git_root(&self, git_root: &Path) -> Result<()> {
        let path = git_root.join(".git").join(ANNOTATION_FILE);
        write_json(&path, self)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut contents = serde_json::to_string_pretty(value)?;
    contents.push('\n');
    fs::write(path, contents)?;
    Ok(())
}
