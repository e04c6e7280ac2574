//! # Trees
//!
//! A tree is the addressable unit of the workspace: a project instance
//! living at a path inside the universe directory, or the workspace root
//! itself. The [`Tree`] trait carries the public contract: identity,
//! checkout, dependency discovery, link creation, persistence.
//! [`GitTree`] is its (currently only) implementation.
//!
//! ## Identity
//!
//! A tree is identified by its `tree_id`: `"git/" + <origin raw spec>`, or
//! the sentinel [`ROOT_TREE_ID`] for the workspace's own root tree. Two
//! trees with equal ids are interchangeable; every identity-sensitive
//! collection in the engine keys on the id string rather than on object
//! identity.
//!
//! ## Provider caching
//!
//! The dependency provider list is computed lazily and cached for the life
//! of the tree instance. A fresh clone invalidates the cache explicitly
//! (dependency declarations may not exist pre-clone); a plain re-checkout
//! does not, it only re-runs provider initialization.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::warn;

use crate::config::{GitAnnotation, TreeRecord};
use crate::error::Result;
use crate::origin::Origin;
use crate::provider::{DependencyProvider, ManifestProvider, SubmoduleProvider};
use crate::workspace::Workspace;

/// Tree id of the workspace's own root tree.
pub const ROOT_TREE_ID: &str = "git/__root__";

/// Sentinel URL stored in the persisted record of the root tree.
pub const ROOT_TREE_URL: &str = "__root__";

/// The single working tree name in use today. Multiple working trees per
/// origin is a declared extension point, not implemented.
pub const DEFAULT_WORKING_TREE: &str = "default";

/// Shared handle to a tree. Handles with equal `tree_id` are
/// interchangeable.
pub type TreeHandle = Rc<dyn Tree>;

/// The public contract of a checkout-tracked tree.
pub trait Tree {
    /// Stable identity of this tree within the workspace.
    fn tree_id(&self) -> String;

    /// The origin URL, if this tree has one (the root tree does not).
    fn origin_url(&self) -> Option<&str>;

    /// Default short name used for `all/` links and initial aliases.
    fn default_alias(&self) -> String;

    /// Whether this is the workspace's own root tree.
    fn is_root(&self) -> bool;

    /// The materialized path: the workspace root for the root tree, a path
    /// under the universe directory for everything else.
    fn path_in_workspace(&self, ws: &Workspace) -> PathBuf;

    /// The dependency providers for this tree, computed on first use and
    /// cached for the instance's lifetime.
    fn dependency_providers(&self, ws: &Workspace) -> Result<Vec<Rc<dyn DependencyProvider>>>;

    /// Drops the cached provider list. Called after a fresh clone, when
    /// dependency declarations may have appeared for the first time.
    fn invalidate_providers(&self);

    /// Clones this tree into place if needed, then (re)runs provider
    /// initialization so submodule bookkeeping and dependency links are
    /// refreshed even on a re-checkout.
    fn checkout(&self, ws: &Workspace) -> Result<()>;

    /// The dependent trees declared by all providers, de-duplicated by id.
    ///
    /// Dependencies that fail to resolve (e.g. unsupported origin scheme)
    /// are logged and skipped; they never abort resolution of the rest.
    fn dependencies(&self, ws: &Workspace) -> Vec<TreeHandle>;

    /// Exposes this tree's materialized path at `target`. No-op for the
    /// root tree.
    fn make_link(&self, ws: &Workspace, target: &Path) -> Result<()>;

    /// Updates the checked-out version, optionally fetching first.
    fn update_version(&self, ws: &Workspace, version: &str, fetch: bool) -> Result<()>;

    /// The record persisted for this tree in the registry.
    fn as_record(&self) -> TreeRecord;
}

impl std::fmt::Debug for dyn Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("tree_id", &self.tree_id())
            .finish()
    }
}

/// A git-backed tree: either a clone under the universe directory or the
/// workspace root checkout.
pub struct GitTree {
    /// `None` marks the root tree.
    origin: Option<Origin>,
    working_tree: String,
    providers: RefCell<Option<Vec<Rc<dyn DependencyProvider>>>>,
}

impl GitTree {
    /// Constructs a tree from a caller-supplied URL.
    pub fn from_url(spec: &str) -> Result<GitTree> {
        Ok(GitTree {
            origin: Some(Origin::parse(spec)?),
            working_tree: DEFAULT_WORKING_TREE.to_string(),
            providers: RefCell::new(None),
        })
    }

    /// Constructs the workspace root tree.
    pub fn root() -> GitTree {
        GitTree {
            origin: None,
            working_tree: DEFAULT_WORKING_TREE.to_string(),
            providers: RefCell::new(None),
        }
    }

    /// The working tree name. Always [`DEFAULT_WORKING_TREE`] today;
    /// multiple working trees per origin is an open extension point.
    pub fn working_tree_name(&self) -> &str {
        &self.working_tree
    }

    /// Reconstructs a tree from its persisted registry record.
    pub fn from_record(record: &TreeRecord) -> Result<GitTree> {
        match record {
            TreeRecord::Git { url, working_tree } => {
                if url == ROOT_TREE_URL {
                    return Ok(GitTree::root());
                }
                Ok(GitTree {
                    origin: Some(Origin::parse(url)?),
                    working_tree: working_tree.clone(),
                    providers: RefCell::new(None),
                })
            }
        }
    }
}

impl Tree for GitTree {
    fn tree_id(&self) -> String {
        match &self.origin {
            Some(origin) => format!("git/{}", origin.raw_spec()),
            None => ROOT_TREE_ID.to_string(),
        }
    }

    fn origin_url(&self) -> Option<&str> {
        self.origin.as_ref().map(Origin::raw_spec)
    }

    fn default_alias(&self) -> String {
        match &self.origin {
            Some(origin) => origin.default_alias(),
            None => ROOT_TREE_URL.to_string(),
        }
    }

    fn is_root(&self) -> bool {
        self.origin.is_none()
    }

    fn path_in_workspace(&self, ws: &Workspace) -> PathBuf {
        match &self.origin {
            Some(origin) => ws.universe_dir().join(origin.universe_path()),
            None => ws.root().to_path_buf(),
        }
    }

    fn dependency_providers(&self, ws: &Workspace) -> Result<Vec<Rc<dyn DependencyProvider>>> {
        if let Some(providers) = self.providers.borrow().as_ref() {
            return Ok(providers.clone());
        }
        let path = self.path_in_workspace(ws);
        let mut providers: Vec<Rc<dyn DependencyProvider>> =
            vec![Rc::new(SubmoduleProvider::new(ws, path.clone())?)];
        if ManifestProvider::exists_at(&path) {
            providers.push(Rc::new(ManifestProvider::new(&path)?));
        }
        *self.providers.borrow_mut() = Some(providers.clone());
        Ok(providers)
    }

    fn invalidate_providers(&self) {
        *self.providers.borrow_mut() = None;
    }

    fn checkout(&self, ws: &Workspace) -> Result<()> {
        let path = self.path_in_workspace(ws);
        if let Some(origin) = &self.origin {
            if !ws.git().is_repository(&path) {
                let mut extra_args = Vec::new();
                if let Some(reference) = &ws.settings().clone_reference {
                    extra_args.push("--reference".to_string());
                    extra_args.push(reference.to_string_lossy().into_owned());
                }
                ws.git().clone_tree(origin.raw_spec(), &path, &extra_args)?;
                GitAnnotation {
                    tree_id: self.tree_id(),
                }
                .save_to_git_root(&path)?;
                // Declarations only exist post-clone.
                self.invalidate_providers();
            }
        }
        // Submodule bookkeeping and links are refreshed even when nothing
        // was cloned.
        for provider in self.dependency_providers(ws)? {
            provider.initialize(ws)?;
        }
        Ok(())
    }

    fn dependencies(&self, ws: &Workspace) -> Vec<TreeHandle> {
        let providers = match self.dependency_providers(ws) {
            Ok(providers) => providers,
            Err(err) => {
                warn!(
                    "could not determine dependency providers for {}: {}",
                    self.tree_id(),
                    err
                );
                return Vec::new();
            }
        };
        let mut seen = std::collections::HashSet::new();
        let mut trees = Vec::new();
        for provider in providers {
            for (source, outcome) in provider.resolve_trees(ws) {
                match outcome {
                    Ok(tree) => {
                        if seen.insert(tree.tree_id()) {
                            trees.push(tree);
                        }
                    }
                    Err(err) => {
                        warn!(
                            "skipping dependency '{}' of {}: {}",
                            source,
                            self.tree_id(),
                            err
                        );
                    }
                }
            }
        }
        trees
    }

    fn make_link(&self, ws: &Workspace, target: &Path) -> Result<()> {
        if self.is_root() {
            return Ok(());
        }
        let source = self.path_in_workspace(ws);
        ws.links().make_link(&source, target)
    }

    fn update_version(&self, ws: &Workspace, version: &str, fetch: bool) -> Result<()> {
        let path = self.path_in_workspace(ws);
        ws.git().checkout_version(&path, version, fetch)
    }

    fn as_record(&self) -> TreeRecord {
        TreeRecord::Git {
            url: self
                .origin_url()
                .unwrap_or(ROOT_TREE_URL)
                .to_string(),
            working_tree: self.working_tree.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_id_forms() {
        let tree = GitTree::from_url("https://github.com/org/repo.git").unwrap();
        assert_eq!(tree.tree_id(), "git/https://github.com/org/repo.git");
        assert_eq!(GitTree::root().tree_id(), ROOT_TREE_ID);
    }

    #[test]
    fn test_identity_is_url_exact() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let a = GitTree::from_url("https://github.com/org/repo.git").unwrap();
        let b = GitTree::from_url("https://github.com/org/repo.git").unwrap();
        assert_eq!(a.tree_id(), b.tree_id());

        let hash = |id: &str| {
            let mut hasher = DefaultHasher::new();
            id.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(&a.tree_id()), hash(&b.tree_id()));

        // Semantically-equivalent URL forms are *not* the same tree. This is
        // the documented identity model, not an accident.
        let ssh = GitTree::from_url("git@github.com:org/repo.git").unwrap();
        assert_ne!(a.tree_id(), ssh.tree_id());
    }

    #[test]
    fn test_record_roundtrip() {
        let tree = GitTree::from_url("https://github.com/org/repo.git").unwrap();
        let record = tree.as_record();
        let restored = GitTree::from_record(&record).unwrap();
        assert_eq!(restored.tree_id(), tree.tree_id());
        assert_eq!(restored.working_tree_name(), DEFAULT_WORKING_TREE);
    }

    #[test]
    fn test_root_record_roundtrip() {
        let record = GitTree::root().as_record();
        assert_eq!(
            record,
            TreeRecord::Git {
                url: ROOT_TREE_URL.to_string(),
                working_tree: DEFAULT_WORKING_TREE.to_string(),
            }
        );
        let restored = GitTree::from_record(&record).unwrap();
        assert!(restored.is_root());
    }

    #[test]
    fn test_default_alias_comes_from_origin() {
        let tree = GitTree::from_url("git@github.com:org/tools.git").unwrap();
        assert_eq!(tree.default_alias(), "tools");
    }
}
