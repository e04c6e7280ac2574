//! # Error Handling
//!
//! Centralized error handling for `unirepo`. A single `thiserror`-derived
//! [`Error`] enum covers every anticipated failure mode, split along the two
//! kinds that matter to callers:
//!
//! - **User-reportable errors** (missing workspace, unsupported origin
//!   scheme, link target conflicts, unresolved symbolic versions, …) which
//!   terminate only the operation that raised them and surface with a
//!   human-readable message.
//! - **External-tool errors** ([`Error::GitCommand`]) which wrap a non-zero
//!   exit of the underlying `git` process together with the failing command
//!   line and working directory for diagnosis.
//!
//! Dependency walks treat both kinds as best-effort at the point of
//! iteration: the failure is logged and the offending tree excluded, while
//! the walk continues. Only failures on the directly-requested tree
//! propagate and abort a command.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for unirepo operations
#[derive(Error, Debug)]
pub enum Error {
    /// No initialized workspace was found at or above the starting directory.
    #[error("Could not find an initialized unirepo workspace under {}", start.display())]
    WorkspaceNotFound { start: PathBuf },

    /// A workspace already exists where one was about to be initialized.
    #[error("Cannot initialize: existing workspace at {}", path.display())]
    WorkspaceExists { path: PathBuf },

    /// A directory required by the workspace layout could not be created.
    #[error("Unable to create directory {}: {message}", path.display())]
    WorkspaceLayout { path: PathBuf, message: String },

    /// An origin URL was neither an `http(s)://` form nor a `user@host:path`
    /// SSH shorthand.
    #[error("Unsupported origin scheme for '{spec}'")]
    UnsupportedOriginScheme { spec: String },

    /// A tree spec did not resolve to a known tree id or alias.
    #[error("Tree '{spec}' is not known in the workspace")]
    UnknownTree { spec: String },

    /// The working tree at the given path is not annotated with a tree id.
    ///
    /// This happens for checkouts that were not produced by `unirepo`.
    #[error("The checkout at {} is not tracked by this workspace", path.display())]
    UntrackedCheckout { path: PathBuf },

    /// A symbolic version was not found among a remote's advertised refs.
    #[error("Symbolic version '{symbolic}' not found for remote '{url}'")]
    UnresolvedSymbolicVersion { symbolic: String, url: String },

    /// A link target already exists and is not something we own.
    #[error("Link target conflict at {}: {message}", path.display())]
    LinkConflict { path: PathBuf, message: String },

    /// A link destination escapes the workspace root, so no relative link
    /// can be constructed.
    #[error("Link destination {} is not relative to {}", path.display(), root.display())]
    LinkEscapesWorkspace { path: PathBuf, root: PathBuf },

    /// A clone destination already has a directory entry.
    #[error("Cannot clone into {} (directory entry exists)", dest.display())]
    CloneConflict { dest: PathBuf },

    /// The external `git` process exited non-zero.
    #[error("git command failed: `{command}` [from {}]: {stderr}", dir.display())]
    GitCommand {
        command: String,
        dir: PathBuf,
        stderr: String,
    },

    /// A dependency manifest file could not be parsed.
    #[error("Invalid dependency manifest {}: {message}", path.display())]
    ManifestParse { path: PathBuf, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON (de)serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
