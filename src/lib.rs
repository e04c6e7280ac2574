//! # Unirepo Library
//!
//! This library is the engine behind the `unirepo` command-line tool: a
//! manager for a workspace composed of many independently-versioned source
//! trees, checked out into a shared universe directory and exposed to
//! consumers as a tree of symbolic links mirroring each project's declared
//! dependency layout.
//!
//! ## Core Concepts
//!
//! - **Origin (`origin`)**: normalized identity of a remote repository,
//!   derived from its URL.
//! - **Tree (`tree`)**: the unit of checkout and version tracking; a
//!   project instance living at a path inside the universe (or the
//!   workspace root itself).
//! - **Workspace (`workspace`)**: the on-disk layout, the tree identity
//!   registry, and the factory for tree handles.
//! - **Dependency providers (`provider`)**: sources of a tree's
//!   sub-dependencies, from VCS submodule metadata or a JSON manifest.
//! - **Link management (`link`, `fsutil`)**: the relative symlinks that
//!   expose materialized trees where consumers expect them.
//! - **Checkout orchestration (`checkout`)**: the recursive worklist that
//!   materializes a tree and its reachable dependency closure, collecting
//!   per-tree failures without aborting the walk.
//! - **Version maps (`version_map`)**: the `tree@symbolic=resolved` pin
//!   mini-language and the first-writer-wins version-cone algorithm.
//!
//! ## Execution model
//!
//! The engine is single-threaded and synchronous: every VCS interaction is
//! a blocking call into the external `git` tool, and ordering guarantees
//! come entirely from the pass-based worklist algorithms, not from locking.
//! Concurrent invocations against the same workspace are unsupported.

pub mod checkout;
pub mod config;
pub mod error;
pub mod fsutil;
pub mod git;
pub mod link;
pub mod origin;
pub mod provider;
pub mod tree;
pub mod version_map;
pub mod workspace;

#[cfg(test)]
mod testutil;
