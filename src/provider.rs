//! # Dependency Providers
//!
//! A dependency provider is a source of a tree's sub-dependencies. Two
//! variants exist:
//!
//! - [`SubmoduleProvider`] reads the VCS submodule declarations of a tree
//!   and redirects each submodule path to the materialized dependency tree
//!   via a symlink, marking the path `skip-worktree` so the VCS engine never
//!   materializes its own copy of the content.
//! - [`ManifestProvider`] reads a declarative JSON manifest
//!   (`unirepo_deps.json`) of [`DependencyRecord`] entries and links the
//!   declared target paths the same way.
//!
//! Both resolve their declared dependencies best-effort: the result of each
//! declaration is reported as a `(source, Result)` pair, and callers
//! partition successes from failures instead of aborting on the first bad
//! entry.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::warn;
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};
use crate::git::SubmoduleInfo;
use crate::tree::{Tree, TreeHandle};
use crate::workspace::Workspace;

/// File name of the dependency manifest, relative to a tree's root.
pub const MANIFEST_FILE: &str = "unirepo_deps.json";

/// A source of a tree's sub-dependencies.
pub trait DependencyProvider {
    /// Resolves each declared dependency to a tree, pairing the declaration
    /// source (its URL) with the outcome. Callers partition: failures are
    /// logged and skipped, never fatal to sibling entries.
    fn resolve_trees(&self, ws: &Workspace) -> Vec<(String, Result<TreeHandle>)>;

    /// Materializes link redirection for the declared dependencies.
    fn initialize(&self, ws: &Workspace) -> Result<()>;

    /// The versions currently pinned for the declared dependencies, paired
    /// with their resolved trees. Entries whose tree fails to resolve are
    /// logged and skipped.
    fn lookup_versions(&self, ws: &Workspace) -> Result<Vec<(TreeHandle, String)>>;
}

/// Dependencies declared through VCS submodule metadata.
pub struct SubmoduleProvider {
    tree_path: PathBuf,
    submodules: Vec<SubmoduleInfo>,
}

impl SubmoduleProvider {
    /// Parses the submodule declarations at `tree_path`. A tree without
    /// declarations (or not yet cloned) yields an empty provider.
    pub fn new(ws: &Workspace, tree_path: PathBuf) -> Result<SubmoduleProvider> {
        let submodules = ws.git().parse_submodule_declarations(&tree_path)?;
        Ok(SubmoduleProvider {
            tree_path,
            submodules,
        })
    }
}

impl DependencyProvider for SubmoduleProvider {
    fn resolve_trees(&self, ws: &Workspace) -> Vec<(String, Result<TreeHandle>)> {
        self.submodules
            .iter()
            .map(|module| (module.url.clone(), ws.get_tree(&module.url)))
            .collect()
    }

    fn initialize(&self, ws: &Workspace) -> Result<()> {
        if self.submodules.is_empty() {
            return Ok(());
        }
        for module in &self.submodules {
            // Keep git from ever materializing its own copy; the
            // universe+symlink layer owns this path.
            ws.git().mark_skip_worktree(&self.tree_path, &module.path)?;

            let tree = match ws.get_tree(&module.url) {
                Ok(tree) => tree,
                Err(err) => {
                    warn!(
                        "skipping submodule '{}' at {}: {}",
                        module.url, module.path, err
                    );
                    continue;
                }
            };
            let link_path = self.tree_path.join(&module.path);
            let source = tree.path_in_workspace(ws);
            ws.links().replace_link(&source, &link_path)?;
        }
        Ok(())
    }

    fn lookup_versions(&self, ws: &Workspace) -> Result<Vec<(TreeHandle, String)>> {
        let pinned = ws.git().parse_submodule_pinned_versions(&self.tree_path)?;
        let mut versions = Vec::new();
        for (path, version) in pinned {
            let Some(module) = self.submodules.iter().find(|m| m.path == path) else {
                warn!(
                    "pinned submodule at '{}' has no declaration in {}",
                    path,
                    self.tree_path.display()
                );
                continue;
            };
            match ws.get_tree(&module.url) {
                Ok(tree) => versions.push((tree, version)),
                Err(err) => warn!("skipping pinned submodule '{}': {}", module.url, err),
            }
        }
        Ok(versions)
    }
}

/// A declarative pointer from a manifest to a dependency and where it is
/// linked inside the owning tree.
#[derive(Debug, Clone, Deserialize)]
pub struct DependencyRecord {
    /// Paths inside the owning tree that link to the dependency. The
    /// manifest may give a single string or a list.
    #[serde(rename = "path", deserialize_with = "one_or_many")]
    pub target_paths: Vec<String>,
    pub version: String,
    pub url: String,
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(path) => vec![path],
        OneOrMany::Many(paths) => paths,
    })
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    deps: Vec<DependencyRecord>,
}

/// Dependencies declared through a JSON manifest file.
#[derive(Debug)]
pub struct ManifestProvider {
    tree_path: PathBuf,
    records: Vec<DependencyRecord>,
}

impl ManifestProvider {
    /// Whether a manifest file is present at the tree's directory.
    pub fn exists_at(tree_path: &Path) -> bool {
        tree_path.join(MANIFEST_FILE).is_file()
    }

    /// Reads and parses the manifest at `tree_path`.
    pub fn new(tree_path: &Path) -> Result<ManifestProvider> {
        let manifest_path = tree_path.join(MANIFEST_FILE);
        let contents = fs::read_to_string(&manifest_path)?;
        let manifest: Manifest =
            serde_json::from_str(&contents).map_err(|e| Error::ManifestParse {
                path: manifest_path,
                message: e.to_string(),
            })?;
        Ok(ManifestProvider {
            tree_path: tree_path.to_path_buf(),
            records: manifest.deps,
        })
    }

    /// The declared records, in manifest order.
    pub fn records(&self) -> &[DependencyRecord] {
        &self.records
    }
}

impl DependencyProvider for ManifestProvider {
    fn resolve_trees(&self, ws: &Workspace) -> Vec<(String, Result<TreeHandle>)> {
        self.records
            .iter()
            .map(|record| (record.url.clone(), ws.get_tree(&record.url)))
            .collect()
    }

    fn initialize(&self, ws: &Workspace) -> Result<()> {
        for record in &self.records {
            let tree = match ws.get_tree(&record.url) {
                Ok(tree) => tree,
                Err(err) => {
                    warn!("skipping manifest dependency '{}': {}", record.url, err);
                    continue;
                }
            };
            let source = tree.path_in_workspace(ws);
            for target in &record.target_paths {
                let link_path = self.tree_path.join(target);
                // Never silently overwrite real content: a manifest target
                // must be a link or absent.
                if link_path.exists() && !link_path.is_symlink() {
                    return Err(Error::LinkConflict {
                        path: link_path,
                        message: "manifest target exists and is not a symlink".to_string(),
                    });
                }
                ws.links().replace_link(&source, &link_path)?;
            }
        }
        Ok(())
    }

    fn lookup_versions(&self, ws: &Workspace) -> Result<Vec<(TreeHandle, String)>> {
        let mut versions = Vec::new();
        for record in &self.records {
            match ws.get_tree(&record.url) {
                Ok(tree) => versions.push((tree, record.version.clone())),
                Err(err) => warn!("skipping manifest dependency '{}': {}", record.url, err),
            }
        }
        Ok(versions)
    }
}
