//! Three-way manifest diff.
//!
//! Classifies every path in the union of a local and a remote manifest as
//! added, changed, or deleted; equal hashes produce no entry. The diff is
//! recomputed fresh on every sync and never persisted.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{io_err, SyncError};
use crate::manifest::{self, hash_bytes};

/// Classification of one path between the local and remote manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffAction {
    /// Present remotely, absent locally.
    Added,
    /// Present in both, hashes differ.
    Changed,
    /// Present locally, absent remotely.
    Deleted,
}

/// Minimal, order-independent change set.
pub type DiffSet = BTreeMap<String, DiffAction>;

/// Diff two manifests given their raw file bytes.
///
/// Byte-identical inputs short-circuit to an empty diff without parsing:
/// the files themselves are hashed, not their parsed contents. Pass `None`
/// for a local manifest that does not exist yet (first sync).
pub fn compute_diff_bytes(
    local_bytes: Option<&[u8]>,
    remote_bytes: &[u8],
) -> Result<DiffSet, SyncError> {
    let local_bytes = local_bytes.unwrap_or(b"{}");

    let mut diff = DiffSet::new();
    if hash_bytes(local_bytes) == hash_bytes(remote_bytes) {
        return Ok(diff);
    }

    let local = manifest::parse(local_bytes)?;
    let remote = manifest::parse(remote_bytes)?;

    for path in local.keys().chain(remote.keys()) {
        if diff.contains_key(path) {
            continue;
        }
        match (local.get(path), remote.get(path)) {
            (Some(ours), Some(theirs)) if ours == theirs => {}
            (Some(_), Some(_)) => {
                diff.insert(path.clone(), DiffAction::Changed);
            }
            (Some(_), None) => {
                diff.insert(path.clone(), DiffAction::Deleted);
            }
            (None, Some(_)) => {
                diff.insert(path.clone(), DiffAction::Added);
            }
            (None, None) => unreachable!("path came from one of the manifests"),
        }
    }
    Ok(diff)
}

/// Diff two manifest files. The local manifest may be absent; the remote
/// must exist.
pub fn compute_diff(local_path: &Path, remote_path: &Path) -> Result<DiffSet, SyncError> {
    let remote_bytes = std::fs::read(remote_path).map_err(|e| io_err(remote_path, e))?;
    let local_bytes = match std::fs::read(local_path) {
        Ok(bytes) => Some(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => return Err(io_err(local_path, err)),
    };
    compute_diff_bytes(local_bytes.as_deref(), &remote_bytes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn identical_bytes_skip_parsing() {
        // Not even valid JSON; the fast path must not parse.
        let diff = compute_diff_bytes(Some(b"not json"), b"not json").expect("diff");
        assert!(diff.is_empty());
    }

    #[test]
    fn classification_matches_hash_equality_rule() {
        let local = br#"{"a.txt":"h1","b.txt":"h2"}"#;
        let remote = br#"{"a.txt":"h1","b.txt":"h3","c.txt":"h4"}"#;
        let diff = compute_diff_bytes(Some(local), remote).expect("diff");

        assert_eq!(diff.len(), 2);
        assert_eq!(diff.get("b.txt"), Some(&DiffAction::Changed));
        assert_eq!(diff.get("c.txt"), Some(&DiffAction::Added));
        assert_eq!(diff.get("a.txt"), None, "equal hashes produce no entry");
    }

    #[test]
    fn missing_local_manifest_means_everything_added() {
        let remote = br#"{"a.txt":"h1","sub/b.txt":"h2"}"#;
        let diff = compute_diff_bytes(None, remote).expect("diff");
        assert_eq!(diff.len(), 2);
        assert!(diff.values().all(|a| *a == DiffAction::Added));
    }

    #[test]
    fn local_only_paths_are_deleted() {
        let local = br#"{"old.txt":"h1"}"#;
        let remote = br#"{}"#;
        let diff = compute_diff_bytes(Some(local), remote).expect("diff");
        assert_eq!(diff.get("old.txt"), Some(&DiffAction::Deleted));
    }

    #[test]
    fn every_union_path_maps_to_exactly_one_outcome() {
        let local = br#"{"same":"x","changed":"a","gone":"y"}"#;
        let remote = br#"{"same":"x","changed":"b","new":"z"}"#;
        let diff = compute_diff_bytes(Some(local), remote).expect("diff");

        // Complete and disjoint over the union {same, changed, gone, new}.
        assert_eq!(diff.len(), 3);
        assert_eq!(diff.get("changed"), Some(&DiffAction::Changed));
        assert_eq!(diff.get("gone"), Some(&DiffAction::Deleted));
        assert_eq!(diff.get("new"), Some(&DiffAction::Added));
        assert!(!diff.contains_key("same"));
    }

    #[test]
    fn file_level_diff_treats_missing_local_as_first_sync() {
        let dir = TempDir::new().expect("tempdir");
        let remote = dir.path().join("hashes-remote.json");
        std::fs::write(&remote, br#"{"a.txt":"h1"}"#).expect("write");

        let diff = compute_diff(&dir.path().join("hashes.json"), &remote).expect("diff");
        assert_eq!(diff.get("a.txt"), Some(&DiffAction::Added));
    }

    #[test]
    fn missing_remote_manifest_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = compute_diff(
            &dir.path().join("hashes.json"),
            &dir.path().join("hashes-remote.json"),
        )
        .expect_err("remote manifest is required");
        assert!(matches!(err, SyncError::Io { .. }));
    }
}
