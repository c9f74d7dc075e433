//! Sync engine — applies a manifest diff against the local cache.
//!
//! Fetches run concurrently under a semaphore-bounded pool; deletions follow
//! an explicit policy. Individual transfer failures never roll back sibling
//! successes, but any failure makes the overall sync a hard error and the
//! remote manifest is not accepted, so the next sync retries.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cache;
use crate::diff::{compute_diff_bytes, DiffAction, DiffSet};
use crate::error::{io_err, SyncError};
use crate::manifest;

/// A failed transfer of one remote file. Carries no transport detail beyond
/// the provider's message.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FetchError(pub String);

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Transfers one remote file to a local destination, overwriting.
///
/// `remote` is a store-relative locator (`<bucket>/<path>`); the
/// implementation owns the actual transport.
pub trait AssetFetcher: Send + Sync + 'static {
    fn fetch(
        &self,
        remote: &str,
        dest: &Path,
    ) -> impl Future<Output = Result<(), FetchError>> + Send;
}

/// What to do with files that exist locally but are gone from the remote
/// store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Remove the local file so the cache mirrors the remote store.
    #[default]
    Remove,
    /// Leave the file on disk and record it as kept.
    Keep,
}

/// Knobs for one sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Upper bound on concurrent fetches within one apply.
    pub max_concurrent_fetches: usize,
    pub delete_policy: DeletePolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 8,
            delete_policy: DeletePolicy::default(),
        }
    }
}

/// One path that failed to transfer or delete.
#[derive(Debug)]
pub struct FetchFailure {
    pub path: String,
    pub error: FetchError,
}

/// Outcome of applying one diff. Path lists are sorted for determinism.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub fetched: Vec<String>,
    pub removed: Vec<String>,
    pub kept: Vec<String>,
    pub failures: Vec<FetchFailure>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl SyncReport {
    /// Total paths the diff asked this run to act on.
    pub fn attempted(&self) -> usize {
        self.fetched.len() + self.removed.len() + self.kept.len() + self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Map a manifest's forward-slash relative path onto the host filesystem.
fn dest_path(local_dir: &Path, rel: &str) -> PathBuf {
    rel.split('/')
        .filter(|segment| !segment.is_empty())
        .fold(local_dir.to_path_buf(), |path, segment| path.join(segment))
}

/// Manifests come from a remote store; refuse paths that would escape the
/// cache directory.
fn is_safe_rel_path(rel: &str) -> bool {
    !rel.starts_with('/') && rel.split('/').all(|segment| segment != "..")
}

/// Apply a diff: fetch added/changed files concurrently (bounded), handle
/// deletions per policy, and report per-path outcomes.
pub async fn apply<F: AssetFetcher>(
    diff: &DiffSet,
    local_dir: &Path,
    remote_base: &str,
    fetcher: &Arc<F>,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    let mut report = SyncReport::default();
    let semaphore = Arc::new(Semaphore::new(options.max_concurrent_fetches.max(1)));
    let mut tasks: JoinSet<Result<String, FetchFailure>> = JoinSet::new();

    for (rel, action) in diff {
        if !is_safe_rel_path(rel) {
            report.failures.push(FetchFailure {
                path: rel.clone(),
                error: FetchError::new("unsafe relative path in manifest"),
            });
            continue;
        }

        match action {
            DiffAction::Added | DiffAction::Changed => {
                let dest = dest_path(local_dir, rel);
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
                }
                let remote = format!("{remote_base}/{rel}");
                let rel = rel.clone();
                let fetcher = Arc::clone(fetcher);
                let semaphore = Arc::clone(&semaphore);
                tasks.spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return Err(FetchFailure {
                                path: rel,
                                error: FetchError::new("fetch pool closed"),
                            })
                        }
                    };
                    match fetcher.fetch(&remote, &dest).await {
                        Ok(()) => Ok(rel),
                        Err(error) => Err(FetchFailure { path: rel, error }),
                    }
                });
            }
            DiffAction::Deleted => match options.delete_policy {
                DeletePolicy::Keep => {
                    tracing::debug!(path = %rel, "remote deletion kept locally by policy");
                    report.kept.push(rel.clone());
                }
                DeletePolicy::Remove => {
                    let target = dest_path(local_dir, rel);
                    match std::fs::remove_file(&target) {
                        Ok(()) => report.removed.push(rel.clone()),
                        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                            report.removed.push(rel.clone());
                        }
                        Err(err) => report.failures.push(FetchFailure {
                            path: rel.clone(),
                            error: FetchError::new(format!("remove failed: {err}")),
                        }),
                    }
                }
            },
        }
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(rel)) => {
                tracing::debug!(path = %rel, "fetched");
                report.fetched.push(rel);
            }
            Ok(Err(failure)) => {
                tracing::warn!(path = %failure.path, error = %failure.error, "transfer failed");
                report.failures.push(failure);
            }
            Err(join_err) => {
                report.failures.push(FetchFailure {
                    path: String::from("<fetch task>"),
                    error: FetchError::new(format!("fetch task panicked: {join_err}")),
                });
            }
        }
    }

    report.fetched.sort();
    report.removed.sort();
    report.kept.sort();
    Ok(report)
}

/// Bring the cache directory for one template bucket into agreement with the
/// remote store.
///
/// Fetches the remote manifest to a transient local copy, diffs it against
/// the accepted local manifest (byte-identity fast path included), applies
/// the diff, and on full success atomically persists the remote manifest
/// bytes as the new baseline. Any transfer failure surfaces as
/// [`SyncError::Incomplete`] so callers never proceed against incomplete
/// templates.
pub async fn sync_template<F: AssetFetcher>(
    cache_root: &Path,
    bucket: &str,
    fetcher: &Arc<F>,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    let template_dir = cache::template_dir(cache_root, bucket);
    std::fs::create_dir_all(&template_dir).map_err(|e| io_err(&template_dir, e))?;

    let remote_tmp = cache::remote_manifest_path(&template_dir);
    let manifest_locator = format!("{bucket}/{}", cache::LOCAL_MANIFEST);
    fetcher
        .fetch(&manifest_locator, &remote_tmp)
        .await
        .map_err(|source| SyncError::RemoteManifest {
            bucket: bucket.to_string(),
            source,
        })?;

    let remote_bytes = std::fs::read(&remote_tmp).map_err(|e| io_err(&remote_tmp, e))?;
    let local_path = cache::local_manifest_path(&template_dir);
    let local_bytes = match std::fs::read(&local_path) {
        Ok(bytes) => Some(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => return Err(io_err(&local_path, err)),
    };

    let diff = compute_diff_bytes(local_bytes.as_deref(), &remote_bytes)?;

    // The remote copy is transient; only the accepted manifest persists.
    if let Err(err) = std::fs::remove_file(&remote_tmp) {
        if err.kind() != std::io::ErrorKind::NotFound {
            return Err(io_err(&remote_tmp, err));
        }
    }

    if diff.is_empty() {
        tracing::debug!(bucket, "template already in sync");
        return Ok(SyncReport {
            synced_at: Some(Utc::now()),
            ..SyncReport::default()
        });
    }

    let (added, changed, deleted) = diff.values().fold((0, 0, 0), |(a, c, d), action| {
        match action {
            DiffAction::Added => (a + 1, c, d),
            DiffAction::Changed => (a, c + 1, d),
            DiffAction::Deleted => (a, c, d + 1),
        }
    });
    tracing::info!(bucket, added, changed, deleted, "syncing template");

    let mut report = apply(&diff, &template_dir, bucket, fetcher, options).await?;
    if !report.is_complete() {
        return Err(SyncError::Incomplete {
            attempted: report.attempted(),
            failed: report.failures,
        });
    }

    manifest::save_atomic(&local_path, &remote_bytes)?;
    report.synced_at = Some(Utc::now());
    Ok(report)
}

// ---------------------------------------------------------------------------
// Filesystem fetcher
// ---------------------------------------------------------------------------

/// Fetcher for stores reachable as a local (or mounted) directory tree.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetFetcher for FsFetcher {
    async fn fetch(&self, remote: &str, dest: &Path) -> Result<(), FetchError> {
        let src = dest_path(&self.root, remote);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FetchError::new(format!("{}: {e}", parent.display())))?;
        }
        std::fs::copy(&src, dest)
            .map(|_| ())
            .map_err(|e| FetchError::new(format!("{}: {e}", src.display())))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
