//! Lexical path resolution and segment sanitization.
//!
//! Every filesystem access in the system goes through [`resolve`] seeded with
//! the trusted base path, so adversarial repo/type/name values can never
//! escape the storage root. Untrusted segments are vetted by
//! [`sanitize_segment`] before they reach the resolver.

use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use crate::error::{StoreError, StoreResult};

/// Join `segments` onto `base` and normalize the result lexically.
///
/// A segment beginning with the path separator discards everything
/// accumulated so far and restarts from that segment. This absolute override
/// is reserved for the trusted `base` argument; callers must pass untrusted
/// values through [`sanitize_segment`] first, which rejects such segments.
///
/// Normalization is purely lexical: `.` components are dropped and `..` pops
/// the previous component (never above the start of the accumulated path).
/// No existence or symlink check is performed.
pub fn resolve(base: &Path, segments: &[&str]) -> PathBuf {
    let sep = MAIN_SEPARATOR;
    let mut working = base.to_string_lossy().into_owned();
    for seg in segments {
        if seg.is_empty() {
            continue;
        }
        if seg.starts_with(sep) {
            working = (*seg).to_string();
        } else {
            working.push(sep);
            working.push_str(seg);
        }
    }

    let absolute = working.starts_with(sep);
    let mut parts: Vec<&str> = Vec::new();
    for comp in working.split(sep) {
        match comp {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    let mut joined = String::new();
    if absolute {
        joined.push(sep);
    }
    joined.push_str(&parts.join(&sep.to_string()));
    PathBuf::from(joined)
}

/// Validate an untrusted repo/type/name segment.
///
/// Rejects empty segments, `.`, `..`, and anything containing a path
/// separator or NUL byte. Rejection is a client error rather than silent
/// sanitization, so a request carrying `../` never reaches the filesystem.
pub fn sanitize_segment(seg: &str) -> StoreResult<&str> {
    if seg.is_empty()
        || seg == "."
        || seg == ".."
        || seg.contains('/')
        || seg.contains(MAIN_SEPARATOR)
        || seg.contains('\0')
    {
        return Err(StoreError::InvalidName(seg.to_string()));
    }
    Ok(seg)
}
