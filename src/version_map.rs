//! # Version Maps
//!
//! A version map is an ordered list of tree/version pins that captures the
//! version state of a span of the workspace. Maps are typically sparse:
//! they pin the versions of key trees while letting the rest float to
//! whatever the first authoritative dependency declares.
//!
//! ## Component syntax
//!
//! ```text
//! tree_id_or_alias ['@' symbolic_version] ['=' resolved_version]
//! ```
//!
//! The split happens on the *last* `=` and then the last `@`, so tree ids
//! that themselves contain `@` (SSH origins) parse correctly. When
//! stringifying a resolved component, the canonical tree id form is always
//! produced.
//!
//! ## Pinning
//!
//! [`apply_pins`] is the "set a version cone" worklist shared by the
//! `version-map --set` and `focus` commands: pass-based, depth-first by
//! discovery, first writer wins. Once a tree has been pinned, later
//! occurrences (typically transitively-discovered pins for the same tree)
//! are ignored, which is exactly how explicit or closer-to-the-root pins
//! take priority.

use std::collections::HashSet;
use std::fmt;

use log::{info, warn};

use crate::error::{Error, Result};
use crate::provider::DependencyProvider;
use crate::tree::{Tree, TreeHandle};
use crate::workspace::Workspace;

/// Symbolic version assumed when a component names neither a symbolic nor a
/// resolved version.
pub const DEFAULT_SYMBOLIC_VERSION: &str = "HEAD";

/// A component's tree reference: a raw spec before resolution, a live tree
/// after.
#[derive(Clone, Debug)]
pub enum TreeSpec {
    Unresolved(String),
    Resolved(TreeHandle),
}

/// A version of a specific tree.
#[derive(Clone, Debug)]
pub struct VersionComponent {
    pub tree: TreeSpec,
    /// A named reference known to the remote (`HEAD`, `refs/heads/main`, …).
    pub symbolic_version: Option<String>,
    /// A concrete commit id.
    pub resolved_version: Option<String>,
}

impl VersionComponent {
    /// Parses a component spec. Never touches the workspace.
    pub fn parse(spec: &str) -> VersionComponent {
        let mut rest = spec;
        let mut resolved_version = None;
        let mut symbolic_version = None;

        if let Some(idx) = rest.rfind('=') {
            if idx + 1 < rest.len() {
                resolved_version = Some(rest[idx + 1..].to_string());
                rest = &rest[..idx];
            }
        }
        if let Some(idx) = rest.rfind('@') {
            if idx + 1 < rest.len() {
                symbolic_version = Some(rest[idx + 1..].to_string());
                rest = &rest[..idx];
            }
        }
        VersionComponent {
            tree: TreeSpec::Unresolved(rest.to_string()),
            symbolic_version,
            resolved_version,
        }
    }

    /// Resolves the tree reference against the workspace (by id, then by
    /// alias), and fills in a missing resolved version from the remote's
    /// advertised refs.
    pub fn resolve(&self, ws: &Workspace) -> Result<VersionComponent> {
        let tree = match &self.tree {
            TreeSpec::Resolved(tree) => tree.clone(),
            TreeSpec::Unresolved(spec) => ws.tree_from_spec(spec)?,
        };

        let mut symbolic_version = self.symbolic_version.clone();
        let mut resolved_version = self.resolved_version.clone();
        if resolved_version.is_none() {
            let symbolic = symbolic_version
                .clone()
                .unwrap_or_else(|| DEFAULT_SYMBOLIC_VERSION.to_string());
            let url = tree.origin_url().ok_or_else(|| Error::UnresolvedSymbolicVersion {
                symbolic: symbolic.clone(),
                url: tree.tree_id(),
            })?;
            let remote_refs = ws.git().list_remote_refs(url)?;
            match remote_refs.get(&symbolic) {
                Some(commit) => {
                    resolved_version = Some(commit.clone());
                    symbolic_version = Some(symbolic);
                }
                None => {
                    return Err(Error::UnresolvedSymbolicVersion {
                        symbolic,
                        url: url.to_string(),
                    });
                }
            }
        }

        Ok(VersionComponent {
            tree: TreeSpec::Resolved(tree),
            symbolic_version,
            resolved_version,
        })
    }
}

impl fmt::Display for VersionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tree {
            TreeSpec::Resolved(tree) => write!(f, "{}", tree.tree_id())?,
            TreeSpec::Unresolved(spec) => write!(f, "{}", spec)?,
        }
        if let Some(symbolic) = &self.symbolic_version {
            write!(f, "@{}", symbolic)?;
        }
        if let Some(resolved) = &self.resolved_version {
            write!(f, "={}", resolved)?;
        }
        Ok(())
    }
}

/// An ordered sequence of version components. Insertion order encodes
/// priority for the pinning worklist.
pub struct VersionMap {
    components: Vec<VersionComponent>,
}

impl VersionMap {
    /// Parses specs into a map. Each spec is additionally split on
    /// whitespace, so a whole map can be passed as one string.
    pub fn parse<'a>(specs: impl IntoIterator<Item = &'a str>) -> VersionMap {
        let mut components = Vec::new();
        for spec in specs {
            components.extend(spec.split_whitespace().map(VersionComponent::parse));
        }
        VersionMap { components }
    }

    pub fn components(&self) -> &[VersionComponent] {
        &self.components
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Resolves all components, returning a new map.
    pub fn resolve(&self, ws: &Workspace) -> Result<VersionMap> {
        let components = self
            .components
            .iter()
            .map(|c| c.resolve(ws))
            .collect::<Result<Vec<_>>>()?;
        Ok(VersionMap { components })
    }
}

impl fmt::Display for VersionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.components {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}", component)?;
            first = false;
        }
        Ok(())
    }
}

/// Outcome of a pinning run.
#[derive(Debug, Default)]
pub struct PinReport {
    /// `(tree_id, version)` pairs that were updated, in processing order.
    pub updated: Vec<(String, String)>,
    /// Transitively-discovered pins that failed, with their messages.
    pub errors: Vec<(String, String)>,
}

struct Pin {
    tree: TreeHandle,
    version: String,
    explicit: bool,
}

/// Applies version pins depth-first by discovery, first writer wins.
///
/// `seeds` are the explicit pins: their failures propagate and abort the
/// run. Every successfully-pinned tree then enqueues its own declared
/// dependency versions for the next pass; failures there are best-effort
/// (logged, collected, skipped). A tree is updated at most once, so pins
/// listed (or encountered) earlier always take precedence over later,
/// transitively-discovered pins for the same tree.
pub fn apply_pins(
    ws: &Workspace,
    seeds: Vec<(TreeHandle, String)>,
    fetch: bool,
) -> Result<PinReport> {
    let mut pending: Vec<Pin> = seeds
        .into_iter()
        .map(|(tree, version)| Pin {
            tree,
            version,
            explicit: true,
        })
        .collect();
    let mut processed: HashSet<String> = HashSet::new();
    let mut report = PinReport::default();

    while !pending.is_empty() {
        let current = std::mem::take(&mut pending);
        for pin in current {
            let tree_id = pin.tree.tree_id();
            // First writer wins.
            if !processed.insert(tree_id.clone()) {
                continue;
            }

            info!("updating {} to {}", tree_id, pin.version);
            if let Err(err) = pin.tree.update_version(ws, &pin.version, fetch) {
                if pin.explicit {
                    return Err(err);
                }
                warn!("skipping version update for {}: {}", tree_id, err);
                report.errors.push((tree_id, err.to_string()));
                continue;
            }
            report.updated.push((tree_id.clone(), pin.version.clone()));

            // Enqueue this tree's own declared dependency versions for the
            // next pass.
            let providers = match pin.tree.dependency_providers(ws) {
                Ok(providers) => providers,
                Err(err) => {
                    warn!("could not read dependencies of {}: {}", tree_id, err);
                    continue;
                }
            };
            for provider in providers {
                match provider.lookup_versions(ws) {
                    Ok(pairs) => {
                        pending.extend(pairs.into_iter().map(|(tree, version)| Pin {
                            tree,
                            version,
                            explicit: false,
                        }));
                    }
                    Err(err) => {
                        warn!("could not read pinned versions for {}: {}", tree_id, err);
                    }
                }
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockGit;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn unresolved(component: &VersionComponent) -> &str {
        match &component.tree {
            TreeSpec::Unresolved(spec) => spec,
            TreeSpec::Resolved(_) => panic!("expected unresolved tree spec"),
        }
    }

    fn mock_workspace(dir: &TempDir) -> (Workspace, Rc<MockGit>) {
        Workspace::init(dir.path()).unwrap();
        let mock = Rc::new(MockGit::default());
        let ws = Workspace::with_git(dir.path(), Box::new(Rc::clone(&mock))).unwrap();
        (ws, mock)
    }

    // ========================================================================
    // Parsing and stringification
    // ========================================================================

    #[test]
    fn test_parse_bare_tree() {
        let c = VersionComponent::parse("foo");
        assert_eq!(unresolved(&c), "foo");
        assert!(c.symbolic_version.is_none());
        assert!(c.resolved_version.is_none());
    }

    #[test]
    fn test_parse_symbolic() {
        let c = VersionComponent::parse("foo@HEAD");
        assert_eq!(unresolved(&c), "foo");
        assert_eq!(c.symbolic_version.as_deref(), Some("HEAD"));
        assert!(c.resolved_version.is_none());
    }

    #[test]
    fn test_parse_symbolic_and_resolved() {
        let c = VersionComponent::parse("foo@HEAD=abcdefg");
        assert_eq!(unresolved(&c), "foo");
        assert_eq!(c.symbolic_version.as_deref(), Some("HEAD"));
        assert_eq!(c.resolved_version.as_deref(), Some("abcdefg"));
    }

    #[test]
    fn test_parse_resolved_only() {
        let c = VersionComponent::parse("git/https://github.com/foo=abcdefg");
        assert_eq!(unresolved(&c), "git/https://github.com/foo");
        assert!(c.symbolic_version.is_none());
        assert_eq!(c.resolved_version.as_deref(), Some("abcdefg"));
    }

    #[test]
    fn test_parse_ssh_tree_id_with_at_sign() {
        // The last '@' wins, so an SSH origin inside the tree id survives.
        let c = VersionComponent::parse("git/git@github.com:org/repo.git@refs/heads/main");
        assert_eq!(unresolved(&c), "git/git@github.com:org/repo.git");
        assert_eq!(c.symbolic_version.as_deref(), Some("refs/heads/main"));
    }

    #[test]
    fn test_parse_map_splits_whitespace() {
        let map = VersionMap::parse(["foo \r\n bar", "gah@v1"]);
        assert_eq!(map.components().len(), 3);
        assert_eq!(unresolved(&map.components()[0]), "foo");
        assert_eq!(unresolved(&map.components()[1]), "bar");
        assert_eq!(unresolved(&map.components()[2]), "gah");
    }

    #[test]
    fn test_display_roundtrip() {
        let map = VersionMap::parse(["foo@HEAD=abc bar"]);
        assert_eq!(map.to_string(), "foo@HEAD=abc bar");
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    #[test]
    fn test_resolve_fills_in_head_by_default() {
        let dir = TempDir::new().unwrap();
        let (ws, mock) = mock_workspace(&dir);
        ws.get_tree("https://h/repo.git").unwrap();
        mock.add_remote_ref("https://h/repo.git", "HEAD", "c0ffee");

        let resolved = VersionComponent::parse("repo").resolve(&ws).unwrap();
        assert_eq!(resolved.symbolic_version.as_deref(), Some("HEAD"));
        assert_eq!(resolved.resolved_version.as_deref(), Some("c0ffee"));
        // Stringification uses the canonical tree id, not the alias.
        assert_eq!(resolved.to_string(), "git/https://h/repo.git@HEAD=c0ffee");
    }

    #[test]
    fn test_resolve_unknown_symbolic_fails() {
        let dir = TempDir::new().unwrap();
        let (ws, mock) = mock_workspace(&dir);
        ws.get_tree("https://h/repo.git").unwrap();
        mock.add_remote_ref("https://h/repo.git", "HEAD", "c0ffee");

        let err = VersionComponent::parse("repo@refs/heads/nope")
            .resolve(&ws)
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedSymbolicVersion { .. }));
    }

    #[test]
    fn test_resolve_unknown_tree_fails() {
        let dir = TempDir::new().unwrap();
        let (ws, _mock) = mock_workspace(&dir);
        let err = VersionComponent::parse("nope").resolve(&ws).unwrap_err();
        assert!(matches!(err, Error::UnknownTree { .. }));
    }

    #[test]
    fn test_resolve_with_resolved_version_skips_remote() {
        let dir = TempDir::new().unwrap();
        let (ws, _mock) = mock_workspace(&dir);
        ws.get_tree("https://h/repo.git").unwrap();

        // No remote refs registered: resolution must not contact the remote.
        let resolved = VersionComponent::parse("repo=abc123").resolve(&ws).unwrap();
        assert_eq!(resolved.resolved_version.as_deref(), Some("abc123"));
    }

    // ========================================================================
    // Pinning worklist
    // ========================================================================

    #[test]
    fn test_first_writer_wins() {
        let dir = TempDir::new().unwrap();
        let (ws, mock) = mock_workspace(&dir);

        let a = ws.get_tree("https://h/a.git").unwrap();
        let b = ws.get_tree("https://h/b.git").unwrap();
        let a_path = a.path_in_workspace(&ws);
        let b_path = b.path_in_workspace(&ws);

        // B transitively pins A at a different version.
        mock.add_submodule(&b_path, "https://h/a.git", "deps/a");
        mock.add_pinned(&b_path, "deps/a", "transitive-pin");

        let report = apply_pins(
            &ws,
            vec![
                (a.clone(), "v1".to_string()),
                (b.clone(), "v2".to_string()),
            ],
            false,
        )
        .unwrap();

        // A was pinned exactly once, to the explicit version.
        let a_updates: Vec<_> = mock
            .checkout_calls
            .borrow()
            .iter()
            .filter(|(path, _, _)| path == &a_path)
            .map(|(_, version, _)| version.clone())
            .collect();
        assert_eq!(a_updates, vec!["v1"]);
        assert_eq!(
            report.updated,
            vec![
                ("git/https://h/a.git".to_string(), "v1".to_string()),
                ("git/https://h/b.git".to_string(), "v2".to_string()),
            ]
        );
    }

    #[test]
    fn test_transitive_pins_propagate_depthwise() {
        let dir = TempDir::new().unwrap();
        let (ws, mock) = mock_workspace(&dir);

        let a = ws.get_tree("https://h/a.git").unwrap();
        let b = ws.get_tree("https://h/b.git").unwrap();
        let a_path = a.path_in_workspace(&ws);
        let b_path = b.path_in_workspace(&ws);

        mock.add_submodule(&a_path, "https://h/b.git", "deps/b");
        mock.add_pinned(&a_path, "deps/b", "b-from-a");

        let report = apply_pins(&ws, vec![(a, "v1".to_string())], true).unwrap();

        assert_eq!(report.updated.len(), 2);
        let calls = mock.checkout_calls.borrow();
        assert_eq!(calls[0], (a_path, "v1".to_string(), true));
        assert_eq!(calls[1], (b_path, "b-from-a".to_string(), true));
    }

    #[test]
    fn test_explicit_pin_failure_aborts() {
        let dir = TempDir::new().unwrap();
        let (ws, mock) = mock_workspace(&dir);
        let a = ws.get_tree("https://h/a.git").unwrap();
        mock.fail_updates
            .borrow_mut()
            .insert(a.path_in_workspace(&ws));

        let err = apply_pins(&ws, vec![(a, "v1".to_string())], false).unwrap_err();
        assert!(matches!(err, Error::GitCommand { .. }));
    }

    #[test]
    fn test_transitive_pin_failure_is_best_effort() {
        let dir = TempDir::new().unwrap();
        let (ws, mock) = mock_workspace(&dir);

        let a = ws.get_tree("https://h/a.git").unwrap();
        let b = ws.get_tree("https://h/b.git").unwrap();
        let a_path = a.path_in_workspace(&ws);
        mock.add_submodule(&a_path, "https://h/b.git", "deps/b");
        mock.add_pinned(&a_path, "deps/b", "vb");
        mock.fail_updates
            .borrow_mut()
            .insert(b.path_in_workspace(&ws));

        let report = apply_pins(&ws, vec![(a, "v1".to_string())], false).unwrap();
        assert_eq!(report.updated.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, "git/https://h/b.git");
    }
}
