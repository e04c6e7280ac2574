//! # Origin Identity
//!
//! An [`Origin`] normalizes a remote repository URL into the canonical,
//! host-relative path under which its tree is materialized in the universe
//! directory, plus a default short name for link creation.
//!
//! Two URL forms are accepted:
//!
//! - `http(s)://host/path`: the scheme is stripped and `host + path` becomes
//!   the universe path.
//! - `user@host:path` (SSH shorthand): the spec is split on the first `:`,
//!   any `user@` prefix is stripped from the host portion, and the same
//!   normalization applies.
//!
//! Anything else fails with [`Error::UnsupportedOriginScheme`].
//!
//! Equality is raw-spec-exact: the SSH and HTTPS forms of the same logical
//! remote are *distinct* origins. No semantic canonicalization is performed
//! across forms; identity follows the URL string the caller supplied.

use std::path::PathBuf;

use url::Url;

use crate::error::{Error, Result};

/// Normalized identity of a remote repository, derived from its URL.
///
/// Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Origin {
    raw_spec: String,
    host: String,
    path: String,
}

impl Origin {
    /// Parses a repository URL into an origin.
    ///
    /// Fails with [`Error::UnsupportedOriginScheme`] for anything that is
    /// neither an `http(s)` URL nor an SSH shorthand.
    pub fn parse(spec: &str) -> Result<Origin> {
        if spec.starts_with("http://") || spec.starts_with("https://") {
            let url = Url::parse(spec).map_err(|_| Error::UnsupportedOriginScheme {
                spec: spec.to_string(),
            })?;
            let host = url
                .host_str()
                .ok_or_else(|| Error::UnsupportedOriginScheme {
                    spec: spec.to_string(),
                })?
                .to_string();
            return Ok(Origin {
                raw_spec: spec.to_string(),
                host,
                path: url.path().trim_start_matches('/').to_string(),
            });
        }

        // SSH shorthand. Explicit schemes other than http(s) are rejected
        // before the colon split so "ftp://host/x" does not masquerade as a
        // host named "ftp".
        if !spec.contains("://") {
            if let Some((host_part, path_part)) = spec.split_once(':') {
                if !host_part.is_empty() && !path_part.is_empty() {
                    let host = match host_part.split_once('@') {
                        Some((_user, host)) => host,
                        None => host_part,
                    };
                    if !host.is_empty() {
                        return Ok(Origin {
                            raw_spec: spec.to_string(),
                            host: host.to_string(),
                            path: path_part.trim_start_matches('/').to_string(),
                        });
                    }
                }
            }
        }

        Err(Error::UnsupportedOriginScheme {
            spec: spec.to_string(),
        })
    }

    /// The exact URL string this origin was constructed from.
    pub fn raw_spec(&self) -> &str {
        &self.raw_spec
    }

    /// The host-relative path under which this origin's tree lives in the
    /// universe directory.
    ///
    /// Slashes are mapped to the local path separator; there is no leading
    /// separator, and a trailing `.git` suffix is kept.
    pub fn universe_path(&self) -> PathBuf {
        let mut out = PathBuf::from(&self.host);
        for segment in self.path.split('/').filter(|s| !s.is_empty()) {
            out.push(segment);
        }
        out
    }

    /// The default short name for this origin: the last universe path
    /// segment, with one trailing `.git` removed if present.
    pub fn default_alias(&self) -> String {
        let last = self
            .path
            .split('/')
            .filter(|s| !s.is_empty())
            .next_back()
            .unwrap_or(&self.host);
        last.strip_suffix(".git").unwrap_or(last).to_string()
    }
}

// Identity is the raw spec, nothing else. The derived host/path fields are a
// pure function of it.
impl PartialEq for Origin {
    fn eq(&self, other: &Self) -> bool {
        self.raw_spec == other.raw_spec
    }
}

impl Eq for Origin {}

impl std::hash::Hash for Origin {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw_spec.hash(state);
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw_spec)
    }
}
