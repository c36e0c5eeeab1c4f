use serde::Serialize;

use crate::error::StoreResult;
use crate::paths::sanitize_segment;

/// The fixed blob type directories every repository carries.
pub const FIXED_TYPES: [&str; 5] = ["data", "index", "keys", "locks", "snapshots"];

/// File name of the per-repository config singleton.
pub const CONFIG_NAME: &str = "config";

/// A repository within the storage root.
///
/// The default repository is the storage root itself, used when a request
/// carries no repo segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RepoId {
    Default,
    Named(String),
}

impl RepoId {
    /// Build a repo id from an optional, untrusted URL segment.
    pub fn from_segment(seg: Option<&str>) -> StoreResult<Self> {
        match seg {
            None => Ok(Self::Default),
            Some(s) => Ok(Self::Named(sanitize_segment(s)?.to_string())),
        }
    }

    /// The directory component under the base path, if any.
    pub fn dir(&self) -> Option<&str> {
        match self {
            Self::Default => None,
            Self::Named(name) => Some(name),
        }
    }

    /// The repo name as seen by access policy. The default repository has
    /// no name and is never matched against a caller identity.
    pub fn name(&self) -> Option<&str> {
        self.dir()
    }
}

/// A logical blob category with its own storage location.
///
/// The five fixed types live in their own subdirectories; `Config` is the
/// per-repository singleton file; any other URL string is accepted as an
/// ordinary non-hashed type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlobKind {
    Data,
    Index,
    Keys,
    Locks,
    Snapshots,
    Config,
    Other(String),
}

impl BlobKind {
    /// Build a blob kind from an untrusted URL type segment.
    ///
    /// `config` is not produced here: the config singleton is addressed by
    /// its own routes, and a literal `config` type segment falls through to
    /// `Other` (its directory never exists, so operations on it fail the
    /// same way they would for any unknown type).
    pub fn from_segment(seg: &str) -> StoreResult<Self> {
        let seg = sanitize_segment(seg)?;
        Ok(match seg {
            "data" => Self::Data,
            "index" => Self::Index,
            "keys" => Self::Keys,
            "locks" => Self::Locks,
            "snapshots" => Self::Snapshots,
            other => Self::Other(other.to_string()),
        })
    }

    /// Directory name under the repository, or `None` for the config
    /// singleton (a plain file, not a directory).
    pub fn dir(&self) -> Option<&str> {
        match self {
            Self::Data => Some("data"),
            Self::Index => Some("index"),
            Self::Keys => Some("keys"),
            Self::Locks => Some("locks"),
            Self::Snapshots => Some("snapshots"),
            Self::Config => None,
            Self::Other(name) => Some(name),
        }
    }

    /// Whether blobs of this kind fan out into two-hex-char shard
    /// directories keyed by the name prefix.
    pub fn is_hashed(&self) -> bool {
        matches!(self, Self::Data)
    }

    /// Whether stale blobs of this kind stay deletable under append-only
    /// mode.
    pub fn deletable_when_append_only(&self) -> bool {
        matches!(self, Self::Locks)
    }
}

impl std::fmt::Display for BlobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            other => write!(f, "{}", other.dir().unwrap_or_default()),
        }
    }
}

/// A listed blob: name plus size in bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BlobEntry {
    pub name: String,
    pub size: u64,
}
