//! # stagehand-sync
//!
//! Content-addressable template cache synchronization.
//!
//! A template lives in a remote content store as a flat tree of files plus a
//! `hashes.json` manifest (relative POSIX path → SHA-256 hex digest).
//! [`sync_template`] fetches the remote manifest, diffs it against the
//! locally accepted one, transfers only the changed bytes under a bounded
//! concurrency pool, and on full success accepts the remote manifest as the
//! new local baseline.

pub mod cache;
pub mod diff;
pub mod engine;
pub mod error;
pub mod manifest;

pub use diff::{DiffAction, DiffSet};
pub use engine::{
    sync_template, AssetFetcher, DeletePolicy, FetchError, FsFetcher, SyncOptions, SyncReport,
};
pub use error::SyncError;
pub use manifest::Manifest;
