//! Filesystem primitives: relative symlink construction and path identity.
//!
//! Links inside the workspace are always *relative* so that a checkout stays
//! self-contained when the workspace directory is moved or mounted somewhere
//! else (containers, network shares). The backtrack math here assumes both
//! endpoints live under a common root and refuses anything that escapes it.
//!
//! Link sources may not exist yet: a dependency tree is often linked into
//! place before its clone has happened. Normalization therefore falls back
//! to resolving the nearest existing ancestor instead of requiring the whole
//! path to resolve.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links require a unix platform",
    ))
}

/// Resolves a path as far as the filesystem allows.
///
/// Existing paths canonicalize fully. For paths that do not exist yet, the
/// nearest existing ancestor is canonicalized and the remaining components
/// are appended lexically (`..` pops, `.` drops).
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    let mut out = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => normalize_path(parent),
        _ => return path.to_path_buf(),
    };
    match path.file_name() {
        Some(name) => out.push(name),
        // `path` ends in "." or "..".
        None => {
            if path.ends_with("..") {
                out.pop();
            }
        }
    }
    out
}

/// Creates a symlink at `dst` pointing to `src`, expressed relative to the
/// common root `relative_to`.
///
/// Both `src` and the parent of `dst` must resolve to paths under
/// `relative_to`; otherwise [`Error::LinkEscapesWorkspace`] is returned and
/// nothing is created. Parent directories of `dst` are created as needed.
/// `src` itself may not exist yet; the link dangles until it does.
pub fn make_relative_link(src: &Path, dst: &Path, relative_to: &Path) -> Result<()> {
    let src = normalize_path(src);
    let relative_to = relative_to.canonicalize()?;

    let parent = dst.parent().ok_or_else(|| Error::LinkEscapesWorkspace {
        path: dst.to_path_buf(),
        root: relative_to.clone(),
    })?;
    fs::create_dir_all(parent)?;
    let file_name = dst.file_name().ok_or_else(|| Error::LinkEscapesWorkspace {
        path: dst.to_path_buf(),
        root: relative_to.clone(),
    })?;
    let dst = parent.canonicalize()?.join(file_name);

    // Accumulate ".." components from the destination's directory back up to
    // the common root.
    let mut backtrack: Option<PathBuf> = None;
    let mut found_common = false;
    for ancestor in dst.ancestors().skip(1) {
        if ancestor == relative_to {
            found_common = true;
            break;
        }
        backtrack = Some(match backtrack {
            Some(acc) => acc.join(".."),
            None => PathBuf::from(".."),
        });
    }
    if !found_common {
        return Err(Error::LinkEscapesWorkspace {
            path: dst,
            root: relative_to,
        });
    }

    let rel_src = src
        .strip_prefix(&relative_to)
        .map_err(|_| Error::LinkEscapesWorkspace {
            path: src.clone(),
            root: relative_to.clone(),
        })?;
    let target = match backtrack {
        Some(acc) => acc.join(rel_src),
        None => rel_src.to_path_buf(),
    };

    symlink(&target, &dst)?;
    Ok(())
}

/// Whether the symlink at `link` resolves to `source`.
///
/// Dangling links still compare by where they *would* resolve, so a link to
/// a not-yet-cloned tree counts as correct.
pub fn link_resolves_to(link: &Path, source: &Path) -> bool {
    let Ok(target) = fs::read_link(link) else {
        return false;
    };
    let resolved = if target.is_absolute() {
        target
    } else {
        link.parent().unwrap_or_else(|| Path::new(".")).join(target)
    };
    normalize_path(&resolved) == normalize_path(source)
}

/// Whether two paths resolve to the same filesystem entry.
///
/// Paths that do not resolve (dangling links, missing entries) are never the
/// same as anything.
pub fn is_same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
