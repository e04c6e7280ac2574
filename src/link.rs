//! # Link Management
//!
//! The [`LinkManager`] exposes a tree's materialized path at caller-chosen
//! locations by creating relative symlinks under the workspace root. It is
//! self-healing for links it owns and conservative about everything else:
//!
//! - A link that already resolves to the requested source is left alone.
//! - A symlink resolving somewhere else, or any non-link entry with content,
//!   is a [`LinkConflict`](crate::error::Error::LinkConflict) and is never
//!   mutated.
//! - Empty directory placeholders (as git leaves behind for uninitialized
//!   submodules) are removed and replaced by the link.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};
use crate::fsutil;

/// Creates and heals the symlinks that expose materialized trees.
#[derive(Debug, Clone)]
pub struct LinkManager {
    workspace_root: PathBuf,
}

impl LinkManager {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        LinkManager {
            workspace_root: workspace_root.into(),
        }
    }

    /// Creates a relative symlink at `target` resolving to `source`.
    ///
    /// Calling this again with the same pair is a no-op. A `target` occupied
    /// by anything other than an empty directory or a link to `source`
    /// fails with a conflict error and is left untouched.
    pub fn make_link(&self, source: &Path, target: &Path) -> Result<()> {
        if target.is_symlink() {
            if fsutil::link_resolves_to(target, source) {
                debug!("link {} already correct", target.display());
                return Ok(());
            }
            return Err(Error::LinkConflict {
                path: target.to_path_buf(),
                message: format!("existing link does not resolve to {}", source.display()),
            });
        }
        if target.exists() {
            if target.is_dir() && fs::read_dir(target)?.next().is_none() {
                // Empty placeholder directory; the link owns this spot.
                fs::remove_dir(target)?;
            } else {
                return Err(Error::LinkConflict {
                    path: target.to_path_buf(),
                    message: "exists and is not a symlink".to_string(),
                });
            }
        }
        fsutil::make_relative_link(source, target, &self.workspace_root)
    }

    /// Re-points a link the caller owns: any existing symlink at `target` is
    /// removed before the link is recreated.
    ///
    /// Non-link entries keep the conservative [`make_link`](Self::make_link)
    /// behavior.
    pub fn replace_link(&self, source: &Path, target: &Path) -> Result<()> {
        if target.is_symlink() {
            fs::remove_file(target)?;
        }
        self.make_link(source, target)
    }
}
