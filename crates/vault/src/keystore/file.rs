//! [`FileKeyStore`]: one file per entry inside a device-local directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use tracing::debug;
use uuid::Uuid;

use super::{validate_name, KeyStore, StoreError};

/// Durable [`KeyStore`] backed by a directory on the local filesystem.
///
/// The directory is created lazily on first use and reused afterwards. Writes
/// go to a temporary sibling first and are then moved into place, so a reader
/// never observes a partially written entry.
#[derive(Debug)]
pub struct FileKeyStore {
    dir: PathBuf,
    opened: OnceCell<()>,
}

impl FileKeyStore {
    /// Create a store rooted at `dir`. Nothing is touched on disk until the
    /// first operation.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            opened: OnceCell::new(),
        }
    }

    /// Directory holding the entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn open(&self, name: &str) -> Result<&Path, StoreError> {
        self.opened
            .get_or_try_init(|| async {
                tokio::fs::create_dir_all(&self.dir)
                    .await
                    .map_err(|source| io_error(name, source))?;
                debug!(dir = %self.dir.display(), "key store opened");
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(&self.dir)
    }

    /// Write `value` to a fresh temporary file next to the entry.
    async fn write_temp(&self, dir: &Path, name: &str, value: &[u8]) -> Result<PathBuf, StoreError> {
        let tmp = dir.join(format!(".{name}.{}.tmp", Uuid::new_v4().simple()));
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .await
            .map_err(|source| io_error(name, source))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|source| io_error(name, source))?;
        }

        let written = async {
            file.write_all(value).await?;
            file.sync_all().await
        }
        .await;
        if let Err(source) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error(name, source));
        }
        Ok(tmp)
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn put(&self, name: &str, value: &[u8]) -> Result<(), StoreError> {
        validate_name(name)?;
        let dir = self.open(name).await?;
        let tmp = self.write_temp(dir, name, value).await?;
        if let Err(source) = tokio::fs::rename(&tmp, dir.join(name)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error(name, source));
        }
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Bytes>, StoreError> {
        validate_name(name)?;
        let dir = self.open(name).await?;
        match tokio::fs::read(dir.join(name)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(io_error(name, source)),
        }
    }

    async fn put_if_absent(&self, name: &str, value: &[u8]) -> Result<bool, StoreError> {
        validate_name(name)?;
        let dir = self.open(name).await?;
        let tmp = self.write_temp(dir, name, value).await?;
        // hard_link fails with AlreadyExists instead of replacing the target.
        let linked = tokio::fs::hard_link(&tmp, dir.join(name)).await;
        let _ = tokio::fs::remove_file(&tmp).await;
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(source) => Err(io_error(name, source)),
        }
    }
}

fn io_error(name: &str, source: std::io::Error) -> StoreError {
    StoreError::Io {
        name: name.to_owned(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("formvault-keystore-{}", Uuid::new_v4()))
    }

    async fn cleanup(dir: &Path) {
        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn directory_created_lazily() {
        let dir = scratch_dir();
        let store = FileKeyStore::new(&dir);
        assert!(!dir.exists());
        assert!(store.get("device-dek").await.unwrap().is_none());
        assert!(dir.is_dir());
        cleanup(&dir).await;
    }

    #[tokio::test]
    async fn put_then_get() {
        let dir = scratch_dir();
        let store = FileKeyStore::new(&dir);
        store.put("device-dek", b"first").await.unwrap();
        store.put("device-dek", b"second").await.unwrap();
        let got = store.get("device-dek").await.unwrap().unwrap();
        assert_eq!(&got[..], b"second");
        cleanup(&dir).await;
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = scratch_dir();
        FileKeyStore::new(&dir).put("device-dek", b"persisted").await.unwrap();
        let reopened = FileKeyStore::new(&dir);
        let got = reopened.get("device-dek").await.unwrap().unwrap();
        assert_eq!(&got[..], b"persisted");
        cleanup(&dir).await;
    }

    #[tokio::test]
    async fn put_if_absent_keeps_first_value() {
        let dir = scratch_dir();
        let store = FileKeyStore::new(&dir);
        assert!(store.put_if_absent("device-dek", b"winner").await.unwrap());
        assert!(!store.put_if_absent("device-dek", b"loser").await.unwrap());
        let got = store.get("device-dek").await.unwrap().unwrap();
        assert_eq!(&got[..], b"winner");
        cleanup(&dir).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_put_if_absent_has_single_winner() {
        let dir = scratch_dir();
        let mut handles = Vec::new();
        for i in 0..16u8 {
            let dir = dir.clone();
            handles.push(tokio::spawn(async move {
                let store = FileKeyStore::new(&dir);
                let created = store.put_if_absent("device-dek", &[i]).await.unwrap();
                (i, created)
            }));
        }

        let mut winners = Vec::new();
        for handle in handles {
            let (i, created) = handle.await.unwrap();
            if created {
                winners.push(i);
            }
        }
        assert_eq!(winners.len(), 1, "winners: {winners:?}");

        let got = FileKeyStore::new(&dir).get("device-dek").await.unwrap().unwrap();
        assert_eq!(&got[..], &[winners[0]]);
        cleanup(&dir).await;
    }

    #[tokio::test]
    async fn no_temp_files_left_behind() {
        let dir = scratch_dir();
        let store = FileKeyStore::new(&dir);
        store.put("device-dek", b"a").await.unwrap();
        store.put_if_absent("device-dek", b"b").await.unwrap();
        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["device-dek".to_string()]);
        cleanup(&dir).await;
    }

    #[tokio::test]
    async fn invalid_name_rejected_before_io() {
        let dir = scratch_dir();
        let store = FileKeyStore::new(&dir);
        let err = store.put("../escape", b"x").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidName(_)));
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn unusable_directory_is_io_error() {
        let dir = scratch_dir();
        tokio::fs::write(&dir, b"not a directory").await.unwrap();
        let store = FileKeyStore::new(&dir);
        let err = store.get("device-dek").await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        let _ = tokio::fs::remove_file(&dir).await;
    }
}
