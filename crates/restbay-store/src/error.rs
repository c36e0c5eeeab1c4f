use std::path::PathBuf;

/// Errors from blob-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A repo/type/name segment failed sanitization.
    #[error("invalid path segment: {0:?}")]
    InvalidName(String),

    /// The requested blob (or its repository/type directory) was not found.
    #[error("blob not found")]
    NotFound,

    /// Exclusive create failed: the blob already exists or the target
    /// directory is missing.
    #[error("exclusive create failed for {path}")]
    CreateConflict { path: PathBuf },

    /// Quota enforcement is active but the caller declared no length.
    #[error("content length required for quota enforcement")]
    LengthRequired,

    /// The write would push the repository past its configured maximum.
    #[error("quota exceeded: {current} + {incoming} > {max}")]
    QuotaExceeded {
        current: u64,
        incoming: u64,
        max: u64,
    },

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
