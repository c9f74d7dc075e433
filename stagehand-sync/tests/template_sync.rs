//! End-to-end template sync against a directory-backed remote store.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use stagehand_sync::manifest::{self, hash_bytes};
use stagehand_sync::{
    cache, sync_template, AssetFetcher, DeletePolicy, FetchError, FsFetcher, SyncError,
    SyncOptions,
};

const BUCKET: &str = "acme/intro";

/// Write template files plus a matching `hashes.json` into the fake remote
/// store.
fn seed_remote(store: &Path, files: &[(&str, &[u8])]) {
    let bucket_dir = cache::template_dir(store, BUCKET);
    let mut entries = manifest::Manifest::new();
    for (rel, bytes) in files {
        let dest = rel
            .split('/')
            .fold(bucket_dir.clone(), |path, segment| path.join(segment));
        std::fs::create_dir_all(dest.parent().expect("parent")).expect("mkdir");
        std::fs::write(&dest, bytes).expect("write remote file");
        entries.insert((*rel).to_string(), hash_bytes(bytes));
    }
    let json = serde_json::to_vec(&entries).expect("serialize manifest");
    std::fs::write(bucket_dir.join("hashes.json"), json).expect("write remote manifest");
}

fn cached(cache_root: &Path, rel: &str) -> PathBuf {
    rel.split('/').fold(
        cache::template_dir(cache_root, BUCKET),
        |path, segment| path.join(segment),
    )
}

#[tokio::test]
async fn first_sync_fetches_everything() {
    let store = TempDir::new().expect("store");
    let cache_root = TempDir::new().expect("cache");
    seed_remote(
        store.path(),
        &[
            ("project.aep", b"project-v1"),
            ("assets/logo.png", b"logo-v1"),
        ],
    );

    let fetcher = Arc::new(FsFetcher::new(store.path()));
    let report = sync_template(
        cache_root.path(),
        BUCKET,
        &fetcher,
        &SyncOptions::default(),
    )
    .await
    .expect("sync");

    assert_eq!(report.fetched, vec!["assets/logo.png", "project.aep"]);
    assert!(report.is_complete());
    assert_eq!(
        std::fs::read(cached(cache_root.path(), "project.aep")).expect("read"),
        b"project-v1"
    );
    // The accepted manifest persisted; the transient remote copy did not.
    let template_dir = cache::template_dir(cache_root.path(), BUCKET);
    assert!(cache::local_manifest_path(&template_dir).exists());
    assert!(!cache::remote_manifest_path(&template_dir).exists());
}

#[tokio::test]
async fn resync_transfers_only_changed_bytes() {
    let store = TempDir::new().expect("store");
    let cache_root = TempDir::new().expect("cache");
    seed_remote(
        store.path(),
        &[
            ("project.aep", b"project-v1"),
            ("assets/logo.png", b"logo-v1"),
        ],
    );

    let fetcher = Arc::new(FsFetcher::new(store.path()));
    let options = SyncOptions::default();
    sync_template(cache_root.path(), BUCKET, &fetcher, &options)
        .await
        .expect("first sync");

    // Remote changes one file and adds another; logo is untouched.
    seed_remote(
        store.path(),
        &[
            ("project.aep", b"project-v2"),
            ("assets/logo.png", b"logo-v1"),
            ("assets/intro.wav", b"wav-v1"),
        ],
    );

    let report = sync_template(cache_root.path(), BUCKET, &fetcher, &options)
        .await
        .expect("second sync");
    assert_eq!(report.fetched, vec!["assets/intro.wav", "project.aep"]);
    assert!(report.removed.is_empty());
}

#[tokio::test]
async fn synced_cache_produces_empty_followup_diff() {
    let store = TempDir::new().expect("store");
    let cache_root = TempDir::new().expect("cache");
    seed_remote(store.path(), &[("project.aep", b"project-v1")]);

    let fetcher = Arc::new(FsFetcher::new(store.path()));
    let options = SyncOptions::default();
    sync_template(cache_root.path(), BUCKET, &fetcher, &options)
        .await
        .expect("first sync");

    let report = sync_template(cache_root.path(), BUCKET, &fetcher, &options)
        .await
        .expect("idempotent sync");
    assert!(report.fetched.is_empty(), "nothing to transfer");
    assert!(report.removed.is_empty());
}

#[tokio::test]
async fn remote_deletion_removes_local_file_by_default() {
    let store = TempDir::new().expect("store");
    let cache_root = TempDir::new().expect("cache");
    seed_remote(
        store.path(),
        &[("project.aep", b"project-v1"), ("old.mov", b"old")],
    );

    let fetcher = Arc::new(FsFetcher::new(store.path()));
    let options = SyncOptions::default();
    sync_template(cache_root.path(), BUCKET, &fetcher, &options)
        .await
        .expect("first sync");

    // old.mov disappears from the remote store entirely.
    std::fs::remove_file(cache::template_dir(store.path(), BUCKET).join("old.mov"))
        .expect("remove remote file");
    seed_remote(store.path(), &[("project.aep", b"project-v1")]);

    let report = sync_template(cache_root.path(), BUCKET, &fetcher, &options)
        .await
        .expect("second sync");
    assert_eq!(report.removed, vec!["old.mov"]);
    assert!(
        !cached(cache_root.path(), "old.mov").exists(),
        "deleted files must not linger in the cache"
    );
}

#[tokio::test]
async fn keep_policy_leaves_deleted_files_in_place() {
    let store = TempDir::new().expect("store");
    let cache_root = TempDir::new().expect("cache");
    seed_remote(
        store.path(),
        &[("project.aep", b"project-v1"), ("old.mov", b"old")],
    );

    let fetcher = Arc::new(FsFetcher::new(store.path()));
    let options = SyncOptions {
        delete_policy: DeletePolicy::Keep,
        ..SyncOptions::default()
    };
    sync_template(cache_root.path(), BUCKET, &fetcher, &options)
        .await
        .expect("first sync");

    std::fs::remove_file(cache::template_dir(store.path(), BUCKET).join("old.mov"))
        .expect("remove remote file");
    seed_remote(store.path(), &[("project.aep", b"project-v1")]);

    let report = sync_template(cache_root.path(), BUCKET, &fetcher, &options)
        .await
        .expect("second sync");
    assert_eq!(report.kept, vec!["old.mov"]);
    assert!(cached(cache_root.path(), "old.mov").exists());
}

// ---------------------------------------------------------------------------
// Failure injection
// ---------------------------------------------------------------------------

/// Delegates to [`FsFetcher`] but fails any path containing `poison`.
struct PoisonedFetcher {
    inner: FsFetcher,
    poison: &'static str,
}

impl AssetFetcher for PoisonedFetcher {
    async fn fetch(&self, remote: &str, dest: &Path) -> Result<(), FetchError> {
        if remote.contains(self.poison) {
            return Err(FetchError::new("injected transfer failure"));
        }
        self.inner.fetch(remote, dest).await
    }
}

#[tokio::test]
async fn partial_failure_is_a_hard_error_but_keeps_successes() {
    let store = TempDir::new().expect("store");
    let cache_root = TempDir::new().expect("cache");
    seed_remote(
        store.path(),
        &[("good.aep", b"good"), ("bad.mov", b"bad")],
    );

    let fetcher = Arc::new(PoisonedFetcher {
        inner: FsFetcher::new(store.path()),
        poison: "bad.mov",
    });
    let options = SyncOptions::default();
    let err = sync_template(cache_root.path(), BUCKET, &fetcher, &options)
        .await
        .expect_err("poisoned transfer must fail the sync");

    match err {
        SyncError::Incomplete { attempted, failed } => {
            assert_eq!(attempted, 2);
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].path, "bad.mov");
        }
        other => panic!("expected Incomplete, got {other}"),
    }

    // The good file transferred and stays; the manifest was not accepted, so
    // the next sync retries the failed path.
    assert!(cached(cache_root.path(), "good.aep").exists());
    let template_dir = cache::template_dir(cache_root.path(), BUCKET);
    assert!(!cache::local_manifest_path(&template_dir).exists());

    let healed = Arc::new(FsFetcher::new(store.path()));
    let report = sync_template(cache_root.path(), BUCKET, &healed, &options)
        .await
        .expect("retry after failure");
    assert!(report.fetched.contains(&"bad.mov".to_string()));
}

#[tokio::test]
async fn missing_remote_manifest_fails_before_any_transfer() {
    let store = TempDir::new().expect("store");
    let cache_root = TempDir::new().expect("cache");

    let fetcher = Arc::new(FsFetcher::new(store.path()));
    let err = sync_template(
        cache_root.path(),
        BUCKET,
        &fetcher,
        &SyncOptions::default(),
    )
    .await
    .expect_err("no remote manifest");
    assert!(matches!(err, SyncError::RemoteManifest { .. }));
}

// ---------------------------------------------------------------------------
// Concurrency bound
// ---------------------------------------------------------------------------

/// Records the peak number of in-flight fetches.
struct GaugedFetcher {
    inner: FsFetcher,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl AssetFetcher for GaugedFetcher {
    async fn fetch(&self, remote: &str, dest: &Path) -> Result<(), FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let result = self.inner.fetch(remote, dest).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[tokio::test(start_paused = true)]
async fn fetch_concurrency_never_exceeds_the_configured_bound() {
    let store = TempDir::new().expect("store");
    let cache_root = TempDir::new().expect("cache");
    let files: Vec<(String, Vec<u8>)> = (0..20)
        .map(|i| (format!("asset-{i:02}.bin"), format!("bytes-{i}").into_bytes()))
        .collect();
    let borrowed: Vec<(&str, &[u8])> = files
        .iter()
        .map(|(rel, bytes)| (rel.as_str(), bytes.as_slice()))
        .collect();
    seed_remote(store.path(), &borrowed);

    let fetcher = Arc::new(GaugedFetcher {
        inner: FsFetcher::new(store.path()),
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let options = SyncOptions {
        max_concurrent_fetches: 3,
        ..SyncOptions::default()
    };

    let report = sync_template(cache_root.path(), BUCKET, &fetcher, &options)
        .await
        .expect("sync");
    assert_eq!(report.fetched.len(), 20);
    let peak = fetcher.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in-flight fetches was {peak}, bound is 3");
    assert!(peak > 1, "fetches should actually overlap");
}
