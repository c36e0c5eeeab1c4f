//! On-demand repository size accounting.
//!
//! The size is recomputed with a full re-walk on every quota-gated write.
//! Each request is dispatched independently with no persisted counter, so
//! there is nothing to keep incrementally up to date; two concurrent writers
//! can both pass the gate against a stale reading (accepted tradeoff).

use std::path::Path;

use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::types::{CONFIG_NAME, FIXED_TYPES};

/// Recompute the total size of a repository in bytes.
///
/// Sums file sizes across the fixed type directories plus the config
/// singleton. Unreadable or missing entries contribute nothing; a repository
/// that was never initialized simply has size zero.
pub fn repo_size(repo_dir: &Path) -> u64 {
    let mut size = 0u64;
    for ty in FIXED_TYPES {
        for entry in WalkDir::new(repo_dir.join(ty))
            .into_iter()
            .filter_map(Result::ok)
        {
            if let Ok(meta) = entry.metadata() {
                if meta.is_file() {
                    size += meta.len();
                }
            }
        }
    }
    if let Ok(meta) = std::fs::metadata(repo_dir.join(CONFIG_NAME)) {
        if meta.is_file() {
            size += meta.len();
        }
    }
    size
}

/// Gate a write of `declared` bytes against `max` (0 = unlimited).
///
/// Requires the declared incoming length up front. Permits the write with no
/// reservation; see the module docs for the accepted race.
pub fn check(repo_dir: &Path, max: u64, declared: Option<u64>) -> StoreResult<()> {
    if max == 0 {
        return Ok(());
    }
    let incoming = declared.ok_or(StoreError::LengthRequired)?;
    let current = repo_size(repo_dir);
    if current + incoming > max {
        tracing::warn!(
            repo = %repo_dir.display(),
            current,
            incoming,
            max,
            "write rejected: repository quota exceeded"
        );
        return Err(StoreError::QuotaExceeded {
            current,
            incoming,
            max,
        });
    }
    Ok(())
}
