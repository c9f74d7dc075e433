//! On-disk cache layout.
//!
//! ```text
//! <cache_root>/                     ($STAGEHAND_CACHE_DIR, default ~/.stagehand/cache)
//!   <bucket path>/                  (one subdirectory per template bucket)
//!     hashes.json                   (accepted local manifest — only persisted sync state)
//!     hashes-remote.json            (transient remote copy, removed after diffing)
//!     ...template files...
//! ```

use std::path::{Path, PathBuf};

use crate::error::SyncError;

pub const CACHE_DIR_ENV: &str = "STAGEHAND_CACHE_DIR";

/// Accepted local manifest filename.
pub const LOCAL_MANIFEST: &str = "hashes.json";

/// Transient destination for the fetched remote manifest.
pub const REMOTE_MANIFEST_TMP: &str = "hashes-remote.json";

/// Resolve the cache root: `$STAGEHAND_CACHE_DIR`, else
/// `<home>/.stagehand/cache`.
pub fn cache_root() -> Result<PathBuf, SyncError> {
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().ok_or(SyncError::HomeNotFound)?;
    Ok(home.join(".stagehand").join("cache"))
}

/// `<root>/<bucket>` — pure, no I/O.
///
/// Bucket paths use forward slashes and map directly onto subdirectories.
pub fn template_dir(root: &Path, bucket: &str) -> PathBuf {
    bucket
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(root.to_path_buf(), |dir, segment| dir.join(segment))
}

/// `<template_dir>/hashes.json`
pub fn local_manifest_path(template_dir: &Path) -> PathBuf {
    template_dir.join(LOCAL_MANIFEST)
}

/// `<template_dir>/hashes-remote.json`
pub fn remote_manifest_path(template_dir: &Path) -> PathBuf {
    template_dir.join(REMOTE_MANIFEST_TMP)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
