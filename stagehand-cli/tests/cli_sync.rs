//! CLI surface tests for `stagehand sync` and `stagehand cache`.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn stagehand() -> Command {
    Command::cargo_bin("stagehand").expect("binary")
}

/// Seed a directory-backed content store with files and a manifest.
fn seed_store(store: &Path, bucket: &str, files: &[(&str, &[u8])]) {
    let bucket_dir = bucket
        .split('/')
        .fold(store.to_path_buf(), |dir, seg| dir.join(seg));
    let mut manifest = serde_json::Map::new();
    for (rel, bytes) in files {
        let dest = rel
            .split('/')
            .fold(bucket_dir.clone(), |dir, seg| dir.join(seg));
        std::fs::create_dir_all(dest.parent().expect("parent")).expect("mkdir");
        std::fs::write(&dest, bytes).expect("write");

        let digest = stagehand_sync::manifest::hash_bytes(bytes);
        manifest.insert((*rel).to_string(), serde_json::Value::String(digest));
    }
    std::fs::write(
        bucket_dir.join("hashes.json"),
        serde_json::to_vec(&serde_json::Value::Object(manifest)).expect("serialize"),
    )
    .expect("write manifest");
}

#[test]
fn help_lists_the_subcommands() {
    stagehand()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("work"))
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("cache"));
}

#[test]
fn cache_path_respects_the_environment_override() {
    let cache = TempDir::new().expect("cache");
    stagehand()
        .env("STAGEHAND_CACHE_DIR", cache.path())
        .args(["cache", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(cache.path().to_string_lossy().as_ref()));
}

#[test]
fn sync_pulls_a_bucket_from_a_local_store() {
    let store = TempDir::new().expect("store");
    let cache = TempDir::new().expect("cache");
    seed_store(
        store.path(),
        "acme/intro",
        &[("project.aep", b"bytes"), ("assets/logo.png", b"logo")],
    );

    stagehand()
        .env("STAGEHAND_CACHE_DIR", cache.path())
        .args(["sync", "acme/intro", "--store"])
        .arg(store.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 fetched"));

    let cached = cache
        .path()
        .join("acme")
        .join("intro")
        .join("assets")
        .join("logo.png");
    assert_eq!(std::fs::read(cached).expect("read"), b"logo");
}

#[test]
fn second_sync_reports_already_in_sync() {
    let store = TempDir::new().expect("store");
    let cache = TempDir::new().expect("cache");
    seed_store(store.path(), "acme/intro", &[("project.aep", b"bytes")]);

    for _ in 0..2 {
        stagehand()
            .env("STAGEHAND_CACHE_DIR", cache.path())
            .args(["sync", "acme/intro", "--store"])
            .arg(store.path())
            .assert()
            .success();
    }

    stagehand()
        .env("STAGEHAND_CACHE_DIR", cache.path())
        .args(["sync", "acme/intro", "--store"])
        .arg(store.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("already in sync"));
}

#[test]
fn cache_manifest_hashes_a_directory_tree() {
    let dir = TempDir::new().expect("dir");
    std::fs::create_dir_all(dir.path().join("assets")).expect("mkdir");
    std::fs::write(dir.path().join("project.aep"), b"project").expect("write");
    std::fs::write(dir.path().join("assets/logo.png"), b"logo").expect("write");

    stagehand()
        .args(["cache", "manifest"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("assets/logo.png"))
        .stdout(predicate::str::contains(
            stagehand_sync::manifest::hash_bytes(b"project"),
        ));
}

#[test]
fn sync_fails_when_the_store_has_no_manifest() {
    let store = TempDir::new().expect("store");
    let cache = TempDir::new().expect("cache");

    stagehand()
        .env("STAGEHAND_CACHE_DIR", cache.path())
        .args(["sync", "acme/missing", "--store"])
        .arg(store.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("sync failed"));
}
