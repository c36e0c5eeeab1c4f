//! CRUD over named blobs on the filesystem.
//!
//! One `BlobStore` serves every repository under a single base directory.
//! Exclusive file creation (`O_CREAT | O_EXCL`) is the only concurrency
//! primitive: at most one writer ever succeeds for a given blob name, which
//! is what gives content-addressed immutability to data/index/keys and is
//! applied uniformly to snapshots, locks, and the config singleton.

use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::error::{StoreError, StoreResult};
use crate::paths::{resolve, sanitize_segment};
use crate::quota;
use crate::types::{BlobEntry, BlobKind, RepoId, CONFIG_NAME, FIXED_TYPES};

/// Filesystem-backed blob store for all repositories under one base path.
#[derive(Clone, Debug)]
pub struct BlobStore {
    base: PathBuf,
    max_repo_size: u64,
}

impl BlobStore {
    /// Create a store rooted at `base` with a per-repository quota in bytes
    /// (0 = unlimited). No filesystem access happens here.
    pub fn new(base: impl Into<PathBuf>, max_repo_size: u64) -> Self {
        Self {
            base: base.into(),
            max_repo_size,
        }
    }

    /// The trusted storage root.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn repo_dir(&self, repo: &RepoId) -> PathBuf {
        match repo.dir() {
            Some(name) => resolve(&self.base, &[name]),
            None => resolve(&self.base, &[]),
        }
    }

    /// Resolve the on-disk path of a blob, shard-aware for hashed kinds.
    fn blob_path(&self, repo: &RepoId, kind: &BlobKind, name: &str) -> StoreResult<PathBuf> {
        let repo_dir = self.repo_dir(repo);
        let Some(dir) = kind.dir() else {
            // Config singleton: a single file directly under the repo.
            return Ok(resolve(&repo_dir, &[CONFIG_NAME]));
        };
        let name = sanitize_segment(name)?;
        if kind.is_hashed() {
            let shard = name.get(..2).unwrap_or(name);
            Ok(resolve(&repo_dir, &[dir, shard, name]))
        } else {
            Ok(resolve(&repo_dir, &[dir, name]))
        }
    }

    /// Metadata-only existence check. Returns the blob size in bytes.
    pub async fn stat(&self, repo: &RepoId, kind: &BlobKind, name: &str) -> StoreResult<u64> {
        let path = self.blob_path(repo, kind, name)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Open a blob for reading. Returns the file handle and its total size.
    pub async fn open(
        &self,
        repo: &RepoId,
        kind: &BlobKind,
        name: &str,
    ) -> StoreResult<(fs::File, u64)> {
        let path = self.blob_path(repo, kind, name)?;
        let file = match fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound)
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();
        Ok((file, size))
    }

    /// Save a new blob, streaming `body` to disk incrementally.
    ///
    /// Runs the quota gate first when a quota is configured (which requires
    /// `declared_len`). The target is created exclusively; shard directories
    /// must already exist from initialization. A failed copy removes the
    /// partial file best-effort before reporting the error.
    pub async fn save<R>(
        &self,
        repo: &RepoId,
        kind: &BlobKind,
        name: &str,
        body: &mut R,
        declared_len: Option<u64>,
    ) -> StoreResult<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        quota::check(&self.repo_dir(repo), self.max_repo_size, declared_len)?;

        let path = self.blob_path(repo, kind, name)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|_| StoreError::CreateConflict { path: path.clone() })?;

        let written = match tokio::io::copy(body, &mut file).await {
            Ok(n) => n,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&path).await;
                return Err(e.into());
            }
        };
        if let Err(e) = file.flush().await {
            drop(file);
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }

        tracing::debug!(blob = %path.display(), written, "blob saved");
        Ok(written)
    }

    /// Delete a blob. Append-only gating happens in the policy layer, not
    /// here.
    pub async fn remove(&self, repo: &RepoId, kind: &BlobKind, name: &str) -> StoreResult<()> {
        let path = self.blob_path(repo, kind, name)?;
        match fs::metadata(&path).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound)
            }
            Err(e) => return Err(e.into()),
        }
        fs::remove_file(&path).await?;
        tracing::debug!(blob = %path.display(), "blob removed");
        Ok(())
    }

    /// List the blobs of one type in a repository.
    ///
    /// For the hashed kind the shard level is flattened: shard directory
    /// names never appear, and duplicate names across shards are impossible
    /// because the shard is derived from the name. A type path that does not
    /// exist, or that is a plain file, lists as empty. Order is unspecified.
    pub async fn list(&self, repo: &RepoId, kind: &BlobKind) -> StoreResult<Vec<BlobEntry>> {
        let dir = kind.dir().ok_or(StoreError::NotFound)?;
        let path = resolve(&self.repo_dir(repo), &[dir]);
        let mut rd = match fs::read_dir(&path).await {
            Ok(rd) => rd,
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                ) =>
            {
                return Ok(Vec::new())
            }
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = rd.next_entry().await? {
            if kind.is_hashed() {
                if !entry.metadata().await?.is_dir() {
                    continue;
                }
                let mut shard = fs::read_dir(entry.path()).await?;
                while let Some(blob) = shard.next_entry().await? {
                    entries.push(BlobEntry {
                        name: blob.file_name().to_string_lossy().into_owned(),
                        size: blob.metadata().await?.len(),
                    });
                }
            } else {
                entries.push(BlobEntry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    size: entry.metadata().await?.len(),
                });
            }
        }
        Ok(entries)
    }

    /// Create a repository's directory skeleton.
    ///
    /// Creates the repo directory (the base itself for the default repo),
    /// each fixed type directory, and the 256 two-hex-digit shard
    /// directories under data. Any failure aborts; partially created
    /// directories are left in place (no rollback).
    pub async fn create_repo(&self, repo: &RepoId) -> StoreResult<()> {
        let repo_dir = self.repo_dir(repo);
        fs::create_dir_all(&repo_dir).await?;

        for ty in FIXED_TYPES {
            fs::create_dir(resolve(&repo_dir, &[ty])).await?;
        }
        let data_dir = resolve(&repo_dir, &["data"]);
        for i in 0..=255u8 {
            fs::create_dir(data_dir.join(format!("{i:02x}"))).await?;
        }

        tracing::info!(repo = %repo_dir.display(), "repository initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> BlobStore {
        BlobStore::new(dir.path(), 0)
    }

    async fn init_default(store: &BlobStore) {
        store.create_repo(&RepoId::Default).await.unwrap();
    }

    // -----------------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn create_repo_builds_full_skeleton() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store
            .create_repo(&RepoId::Named("alice".into()))
            .await
            .unwrap();

        let repo = dir.path().join("alice");
        for ty in FIXED_TYPES {
            assert!(repo.join(ty).is_dir(), "missing type dir {ty}");
        }
        let shards: Vec<_> = std::fs::read_dir(repo.join("data"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(shards.len(), 256);
        assert!(shards.contains(&"00".to_string()));
        assert!(shards.contains(&"ff".to_string()));
        // No config directory; config is a file created on first save.
        assert!(!repo.join("config").exists());
    }

    #[tokio::test]
    async fn create_repo_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let repo = RepoId::Named("alice".into());
        store.create_repo(&repo).await.unwrap();
        assert!(matches!(
            store.create_repo(&repo).await,
            Err(StoreError::Io(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Save / read / exclusive create
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn save_and_stat_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        init_default(&store).await;

        let n = store
            .save(
                &RepoId::Default,
                &BlobKind::Keys,
                "k1",
                &mut &b"key material"[..],
                None,
            )
            .await
            .unwrap();
        assert_eq!(n, 12);
        let size = store
            .stat(&RepoId::Default, &BlobKind::Keys, "k1")
            .await
            .unwrap();
        assert_eq!(size, 12);
    }

    #[tokio::test]
    async fn second_save_fails_and_content_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        init_default(&store).await;
        let repo = RepoId::Default;

        store
            .save(&repo, &BlobKind::Snapshots, "s1", &mut &b"first"[..], None)
            .await
            .unwrap();
        let err = store
            .save(&repo, &BlobKind::Snapshots, "s1", &mut &b"second"[..], None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CreateConflict { .. }));

        let content = std::fs::read(dir.path().join("snapshots/s1")).unwrap();
        assert_eq!(content, b"first");
    }

    #[tokio::test]
    async fn data_blobs_land_in_their_shard() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        init_default(&store).await;

        store
            .save(&RepoId::Default, &BlobKind::Data, "ab11", &mut &b"x"[..], None)
            .await
            .unwrap();
        assert!(dir.path().join("data/ab/ab11").is_file());
    }

    #[tokio::test]
    async fn save_does_not_create_missing_shards() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        // Uninitialized repo: no shard directories exist.
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        let err = store
            .save(&RepoId::Default, &BlobKind::Data, "ab11", &mut &b"x"[..], None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CreateConflict { .. }));
        assert!(!dir.path().join("data/ab").exists());
    }

    #[tokio::test]
    async fn traversal_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        init_default(&store).await;

        for bad in ["..", "../escape", "a/b", "/abs"] {
            let err = store
                .save(&RepoId::Default, &BlobKind::Keys, bad, &mut &b"x"[..], None)
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::InvalidName(_)), "accepted {bad:?}");
        }
    }

    // -----------------------------------------------------------------------
    // Quota
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn quota_requires_declared_length() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path(), 1024);
        init_default(&store).await;

        let err = store
            .save(&RepoId::Default, &BlobKind::Keys, "k1", &mut &b"x"[..], None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::LengthRequired));
    }

    #[tokio::test]
    async fn over_quota_save_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path(), 100);
        init_default(&store).await;
        let repo = RepoId::Default;

        store
            .save(&repo, &BlobKind::Keys, "k1", &mut &vec![0u8; 80][..], Some(80))
            .await
            .unwrap();
        let err = store
            .save(&repo, &BlobKind::Keys, "k2", &mut &vec![0u8; 30][..], Some(30))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { .. }));
        assert!(!dir.path().join("keys/k2").exists());

        // Exactly at the boundary still fits.
        store
            .save(&repo, &BlobKind::Keys, "k3", &mut &vec![0u8; 20][..], Some(20))
            .await
            .unwrap();
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn remove_existing_then_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        init_default(&store).await;
        let repo = RepoId::Default;

        store
            .save(&repo, &BlobKind::Locks, "l1", &mut &b"lock"[..], None)
            .await
            .unwrap();
        store.remove(&repo, &BlobKind::Locks, "l1").await.unwrap();
        assert!(matches!(
            store.remove(&repo, &BlobKind::Locks, "l1").await,
            Err(StoreError::NotFound)
        ));
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn hashed_listing_flattens_shards() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        init_default(&store).await;
        let repo = RepoId::Default;

        for name in ["ab11", "ab22", "cd33"] {
            store
                .save(&repo, &BlobKind::Data, name, &mut &b"blob"[..], None)
                .await
                .unwrap();
        }

        let mut names: Vec<String> = store
            .list(&repo, &BlobKind::Data)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        names.sort();
        assert_eq!(names, ["ab11", "ab22", "cd33"]);
    }

    #[tokio::test]
    async fn listing_carries_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        init_default(&store).await;
        let repo = RepoId::Default;

        store
            .save(&repo, &BlobKind::Index, "i1", &mut &b"12345"[..], None)
            .await
            .unwrap();
        let entries = store.list(&repo, &BlobKind::Index).await.unwrap();
        assert_eq!(entries, vec![BlobEntry { name: "i1".into(), size: 5 }]);
    }

    #[tokio::test]
    async fn listing_a_file_typed_path_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        init_default(&store).await;
        store
            .save(&RepoId::Default, &BlobKind::Config, "", &mut &b"cfg"[..], None)
            .await
            .unwrap();

        // A literal "config" type segment resolves to the singleton file.
        let entries = store
            .list(&RepoId::Default, &BlobKind::Other("config".into()))
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn listing_missing_type_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let entries = store
            .list(&RepoId::Default, &BlobKind::Other("unknown".into()))
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    // -----------------------------------------------------------------------
    // Config singleton
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn config_follows_exclusive_create_rules() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        init_default(&store).await;
        let repo = RepoId::Default;

        store
            .save(&repo, &BlobKind::Config, "", &mut &b"cfg"[..], None)
            .await
            .unwrap();
        assert!(dir.path().join("config").is_file());
        assert_eq!(store.stat(&repo, &BlobKind::Config, "").await.unwrap(), 3);

        let err = store
            .save(&repo, &BlobKind::Config, "", &mut &b"cfg2"[..], None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CreateConflict { .. }));

        store.remove(&repo, &BlobKind::Config, "").await.unwrap();
        assert!(matches!(
            store.stat(&repo, &BlobKind::Config, "").await,
            Err(StoreError::NotFound)
        ));
    }

    // -----------------------------------------------------------------------
    // Named repositories
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn named_repos_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let alice = RepoId::Named("alice".into());
        let bob = RepoId::Named("bob".into());
        store.create_repo(&alice).await.unwrap();
        store.create_repo(&bob).await.unwrap();

        store
            .save(&alice, &BlobKind::Keys, "k1", &mut &b"a"[..], None)
            .await
            .unwrap();
        assert!(matches!(
            store.stat(&bob, &BlobKind::Keys, "k1").await,
            Err(StoreError::NotFound)
        ));
    }
}
