//! Filesystem blob-store engine for the restbay backup server.
//!
//! This crate implements the storage side of a restic-style REST backend:
//! repositories are directories under one trusted base path, blobs are files
//! under per-type subdirectories, and the data type fans out across 256
//! two-hex-digit shard directories keyed by the blob name prefix.
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once written: exclusive file creation makes the
//!    second write to a name fail, even under concurrent requests.
//! 2. Every filesystem path is produced by [`paths::resolve`] seeded with
//!    the trusted base; untrusted segments are sanitized first and can never
//!    escape the root.
//! 3. Quota accounting is recomputed on demand by a full re-walk, never
//!    cached across requests.
//! 4. Bodies stream to disk incrementally; a blob body is never buffered in
//!    memory.
//! 5. I/O errors from blob operations are propagated; only the quota
//!    re-walk tolerates unreadable entries.

pub mod error;
pub mod paths;
pub mod quota;
pub mod store;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use store::BlobStore;
pub use types::{BlobEntry, BlobKind, RepoId, CONFIG_NAME, FIXED_TYPES};
