//! Hash manifests — SHA-256 content digests keyed by relative path.
//!
//! The on-disk form is a flat JSON object, UTF-8, keys using forward-slash
//! separators on every platform so manifests are portable across machines.
//! There is no versioning field; an absent file means "first sync".
//! Writes use the same atomic `.tmp` + rename pattern as the rest of the
//! cache.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};

/// In-memory manifest: relative POSIX path → lowercase hex SHA-256 digest.
pub type Manifest = BTreeMap<String, String>;

/// SHA-256 of `bytes`, lowercase hex.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// SHA-256 of a file's raw contents.
pub fn hash_file(path: &Path) -> Result<String, SyncError> {
    let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
    Ok(hash_bytes(&bytes))
}

/// Parse manifest bytes into a path → digest mapping.
pub fn parse(bytes: &[u8]) -> Result<Manifest, SyncError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Load a manifest file; `Ok(None)` when it does not exist.
pub fn load(path: &Path) -> Result<Option<Manifest>, SyncError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(parse(&bytes)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Atomically persist raw manifest bytes: write `<path>.tmp`, then rename.
///
/// The raw bytes are kept verbatim so the byte-identity fast path in
/// [`crate::diff::compute_diff_bytes`] keeps firing on unchanged stores.
pub fn save_atomic(path: &Path, bytes: &[u8]) -> Result<(), SyncError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(
            path,
            std::io::Error::other("manifest path has no parent directory"),
        ));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Build a manifest from the files currently on disk under `dir`.
///
/// Keys are forward-slash relative paths; the manifest files themselves are
/// excluded. Used to seed stores and to audit a cache directory.
pub fn build(dir: &Path) -> Result<Manifest, SyncError> {
    let mut manifest = Manifest::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = std::fs::read_dir(&current).map_err(|e| io_err(&current, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&current, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            let rel = path
                .strip_prefix(dir)
                .unwrap_or(path.as_path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if rel == crate::cache::LOCAL_MANIFEST || rel == crate::cache::REMOTE_MANIFEST_TMP {
                continue;
            }
            manifest.insert(rel, hash_file(&path)?);
        }
    }
    Ok(manifest)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
