//! # Workspace Management
//!
//! The [`Workspace`] owns the on-disk layout and the tree identity
//! registry, and is the factory through which all [`Tree`] handles are
//! obtained.
//!
//! ## Layout
//!
//! ```text
//! <root>/
//!   .unirepo/
//!     universe/        materialized trees, organized by normalized origin
//!     config/
//!       trees.json     tree registry + alias table
//!       settings.json  workspace settings
//!   all/               default-alias-named links to all checked-out trees
//! ```
//!
//! ## Design
//!
//! The VCS client sits behind a `Box<dyn GitOperations>` seam so the
//! worklist algorithms can be exercised with mock implementations in tests.
//! Tree instances are cached per id, so every lookup of the same tree
//! returns the same handle and shares its provider cache. The registry only
//! grows; a tree discovered once stays registered for the life of the
//! workspace.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::warn;

use crate::config::{GitAnnotation, TreesConfig, WorkspaceSettings};
use crate::error::{Error, Result};
use crate::fsutil;
use crate::git::{GitOperations, SystemGit};
use crate::link::LinkManager;
use crate::tree::{GitTree, Tree, TreeHandle, ROOT_TREE_ID};

/// Name of the hidden control directory at the workspace root.
pub const WORKSPACE_DIR: &str = ".unirepo";

/// Name of the universe directory inside the control directory.
pub const UNIVERSE_DIR: &str = "universe";

/// Name of the conventional all-trees link directory at the workspace root.
pub const ALL_TREES_DIR: &str = "all";

const CONFIG_DIR: &str = "config";
const TREES_FILE: &str = "trees.json";
const SETTINGS_FILE: &str = "settings.json";

/// An on-disk workspace of checkout-tracked trees.
pub struct Workspace {
    root: PathBuf,
    git: Box<dyn GitOperations>,
    links: LinkManager,
    settings: WorkspaceSettings,
    registry: RefCell<TreesConfig>,
    instances: RefCell<HashMap<String, TreeHandle>>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Opens the workspace rooted at `root` with the system git client.
    pub fn open(root: &Path) -> Result<Workspace> {
        Workspace::with_git(root, Box::new(SystemGit::new()))
    }

    /// Opens the workspace rooted at `root` with the given VCS client.
    pub fn with_git(root: &Path, git: Box<dyn GitOperations>) -> Result<Workspace> {
        let root = root.canonicalize().map_err(|_| Error::WorkspaceNotFound {
            start: root.to_path_buf(),
        })?;
        let control = root.join(WORKSPACE_DIR);
        if !control.is_dir() || !control.join(UNIVERSE_DIR).is_dir() {
            return Err(Error::WorkspaceNotFound { start: root });
        }
        let config_dir = control.join(CONFIG_DIR);
        let registry = TreesConfig::load(config_dir.join(TREES_FILE))?;
        let settings = WorkspaceSettings::load(&config_dir.join(SETTINGS_FILE))?;
        Ok(Workspace {
            links: LinkManager::new(&root),
            root,
            git,
            settings,
            registry: RefCell::new(registry),
            instances: RefCell::new(HashMap::new()),
        })
    }

    /// Walks upward from `start` looking for an initialized workspace.
    pub fn find_from_cwd(start: &Path) -> Result<Workspace> {
        let start = fsutil::normalize_path(start);
        for dir in start.ancestors() {
            let control = dir.join(WORKSPACE_DIR);
            if control.is_dir() && control.join(UNIVERSE_DIR).is_dir() {
                return Workspace::open(dir);
            }
        }
        Err(Error::WorkspaceNotFound { start })
    }

    /// Initializes a new workspace at `cwd`.
    ///
    /// It is an error to initialize inside an existing workspace.
    pub fn init(cwd: &Path) -> Result<Workspace> {
        if let Ok(existing) = Workspace::find_from_cwd(cwd) {
            return Err(Error::WorkspaceExists {
                path: existing.root,
            });
        }
        let control = cwd.join(WORKSPACE_DIR);
        make_dir(&control)?;
        make_dir(&control.join(UNIVERSE_DIR))?;
        make_dir(&control.join(CONFIG_DIR))?;
        Workspace::open(cwd)
    }

    /// The workspace top-level directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The hidden control directory.
    pub fn control_dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    /// The universe directory holding materialized trees.
    pub fn universe_dir(&self) -> PathBuf {
        self.control_dir().join(UNIVERSE_DIR)
    }

    /// The conventional directory of default-alias links to all trees.
    pub fn all_dir(&self) -> PathBuf {
        self.root.join(ALL_TREES_DIR)
    }

    /// The VCS client.
    pub fn git(&self) -> &dyn GitOperations {
        self.git.as_ref()
    }

    /// The link manager for this workspace.
    pub fn links(&self) -> &LinkManager {
        &self.links
    }

    /// Workspace settings.
    pub fn settings(&self) -> &WorkspaceSettings {
        &self.settings
    }

    /// Obtains (and registers, on first sight) the tree for a repository
    /// URL.
    ///
    /// The first discovery persists the tree's record and binds its default
    /// alias (de-duplicated against existing bindings).
    pub fn get_tree(&self, url: &str) -> Result<TreeHandle> {
        let tree = GitTree::from_url(url)?;
        let tree_id = tree.tree_id();
        if let Some(existing) = self.instances.borrow().get(&tree_id) {
            return Ok(existing.clone());
        }
        let handle: TreeHandle = Rc::new(tree);
        {
            let mut registry = self.registry.borrow_mut();
            if !registry.contains(&tree_id) {
                registry.insert(tree_id.clone(), handle.as_record());
                registry.add_alias(&handle.default_alias(), &tree_id);
                registry.save()?;
            }
        }
        self.instances
            .borrow_mut()
            .insert(tree_id, handle.clone());
        Ok(handle)
    }

    /// The workspace's own root tree, registering it on first use.
    pub fn root_tree(&self) -> Result<TreeHandle> {
        if let Some(existing) = self.instances.borrow().get(ROOT_TREE_ID) {
            return Ok(existing.clone());
        }
        let handle: TreeHandle = Rc::new(GitTree::root());
        {
            let mut registry = self.registry.borrow_mut();
            if !registry.contains(ROOT_TREE_ID) {
                registry.insert(ROOT_TREE_ID.to_string(), handle.as_record());
                registry.save()?;
            }
        }
        self.instances
            .borrow_mut()
            .insert(ROOT_TREE_ID.to_string(), handle.clone());
        Ok(handle)
    }

    /// Looks up a tree by its exact id.
    pub fn tree_from_id(&self, tree_id: &str) -> Option<TreeHandle> {
        if let Some(existing) = self.instances.borrow().get(tree_id) {
            return Some(existing.clone());
        }
        let record = self.registry.borrow().record(tree_id)?.clone();
        match GitTree::from_record(&record) {
            Ok(tree) => {
                let handle: TreeHandle = Rc::new(tree);
                self.instances
                    .borrow_mut()
                    .insert(tree_id.to_string(), handle.clone());
                Some(handle)
            }
            Err(err) => {
                warn!("corrupt registry record for {}: {}", tree_id, err);
                None
            }
        }
    }

    /// Looks up a tree through the alias table.
    pub fn tree_from_alias(&self, alias: &str) -> Option<TreeHandle> {
        let tree_id = self.registry.borrow().alias_target(alias)?.to_string();
        self.tree_from_id(&tree_id)
    }

    /// Resolves a tree spec: first as an id, then as an alias.
    pub fn tree_from_spec(&self, spec: &str) -> Result<TreeHandle> {
        self.tree_from_id(spec)
            .or_else(|| self.tree_from_alias(spec))
            .ok_or_else(|| Error::UnknownTree {
                spec: spec.to_string(),
            })
    }

    /// Resolves the tree containing `cwd`, via the clone annotation (or the
    /// workspace root itself).
    pub fn tree_from_cwd(&self, cwd: &Path) -> Result<TreeHandle> {
        let toplevel = self.git.find_toplevel(cwd)?;
        if fsutil::is_same_path(&toplevel, &self.root) {
            return self.root_tree();
        }
        let annotation = GitAnnotation::from_git_root(&toplevel)?;
        self.tree_from_id(&annotation.tree_id)
            .ok_or(Error::UnknownTree {
                spec: annotation.tree_id,
            })
    }

    /// All registered trees, in stable id order.
    pub fn all_trees(&self) -> Vec<TreeHandle> {
        let ids: Vec<String> = self
            .registry
            .borrow()
            .tree_ids()
            .map(str::to_string)
            .collect();
        ids.iter().filter_map(|id| self.tree_from_id(id)).collect()
    }
}

fn make_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| Error::WorkspaceLayout {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
