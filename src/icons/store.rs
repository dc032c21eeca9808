use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::hash::IconHash;
use crate::errors::{IconStoreError, IconStoreResult};

const ICON_FILE: &str = "icon";
const HASH_FILE: &str = "icon.hash";
const READ_ATTEMPTS: usize = 3;

/// Icon bytes together with the hash that identifies them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredIcon {
    pub bytes: Bytes,
    pub hash: IconHash,
}

/// Blob store holding at most one icon per user name
///
/// A missing icon is reported as [`IconStoreError::NotFound`], never as an
/// I/O error, so callers can fall back to the default image.
#[async_trait]
pub trait IconStore: Send + Sync {
    /// Read the precomputed hash of the user's icon without touching the bytes
    async fn read_hash(&self, name: &str) -> IconStoreResult<IconHash>;

    /// Read the icon bytes along with the hash that matches them
    async fn read_icon(&self, name: &str) -> IconStoreResult<StoredIcon>;

    /// Replace the user's icon, returning the hash of the new bytes
    async fn write_icon(&self, name: &str, bytes: Bytes) -> IconStoreResult<IconHash>;

    /// Remove every stored icon, returning the number of users affected
    async fn clear(&self) -> IconStoreResult<usize>;
}

/// Whether `name` can be used as a directory name under the icon root
pub fn is_valid_icon_key(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Filesystem icon store: `<root>/<name>/icon` and `<root>/<name>/icon.hash`
#[derive(Debug, Clone)]
pub struct FsIconStore {
    root: PathBuf,
}

impl FsIconStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_dir(&self, name: &str) -> IconStoreResult<PathBuf> {
        if !is_valid_icon_key(name) {
            return Err(IconStoreError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    fn not_found(name: &str, err: std::io::Error) -> IconStoreError {
        if err.kind() == ErrorKind::NotFound {
            IconStoreError::NotFound(name.to_string())
        } else {
            IconStoreError::Io(err)
        }
    }

    /// Write through a sibling temp file so readers only ever see whole files
    async fn replace_file(dir: &Path, file_name: &str, data: &[u8]) -> IconStoreResult<()> {
        let tmp_path = dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp_path, data).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp_path, dir.join(file_name)).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl IconStore for FsIconStore {
    async fn read_hash(&self, name: &str) -> IconStoreResult<IconHash> {
        let path = self.user_dir(name)?.join(HASH_FILE);
        let stored = fs::read_to_string(&path)
            .await
            .map_err(|e| Self::not_found(name, e))?;
        Ok(IconHash::from_stored(&stored))
    }

    async fn read_icon(&self, name: &str) -> IconStoreResult<StoredIcon> {
        let path = self.user_dir(name)?.join(ICON_FILE);

        // Bytes are renamed into place before the hash, so a concurrent
        // replace can briefly pair new bytes with the old hash.
        for attempt in 1..=READ_ATTEMPTS {
            let bytes = Bytes::from(
                fs::read(&path)
                    .await
                    .map_err(|e| Self::not_found(name, e))?,
            );
            let hash = self.read_hash(name).await?;
            if IconHash::of(&bytes) == hash {
                return Ok(StoredIcon { bytes, hash });
            }
            debug!(
                "Icon for '{}' changed while reading (attempt {}/{})",
                name, attempt, READ_ATTEMPTS
            );
            tokio::task::yield_now().await;
        }

        warn!(
            "Stored hash for '{}' does not match its icon bytes; serving computed hash",
            name
        );
        let bytes = Bytes::from(
            fs::read(&path)
                .await
                .map_err(|e| Self::not_found(name, e))?,
        );
        let hash = IconHash::of(&bytes);
        Ok(StoredIcon { bytes, hash })
    }

    async fn write_icon(&self, name: &str, bytes: Bytes) -> IconStoreResult<IconHash> {
        let dir = self.user_dir(name)?;
        fs::create_dir_all(&dir).await?;

        let hash = IconHash::of(&bytes);
        Self::replace_file(&dir, ICON_FILE, &bytes).await?;
        Self::replace_file(&dir, HASH_FILE, hash.as_str().as_bytes()).await?;

        debug!("Stored icon for '{}' ({} bytes, {})", name, bytes.len(), hash);
        Ok(hash)
    }

    async fn clear(&self) -> IconStoreResult<usize> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                fs::remove_dir_all(entry.path()).await?;
                removed += 1;
            }
        }

        info!(
            "Removed {} user icon directories from {}",
            removed,
            self.root.display()
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_icon_key() {
        assert!(is_valid_icon_key("alice"));
        assert!(is_valid_icon_key("alice.bob"));
        assert!(!is_valid_icon_key(""));
        assert!(!is_valid_icon_key("."));
        assert!(!is_valid_icon_key(".."));
        assert!(!is_valid_icon_key("../etc"));
        assert!(!is_valid_icon_key("a\\b"));
    }

    #[tokio::test]
    async fn test_missing_icon_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsIconStore::new(dir.path().to_path_buf());

        assert!(matches!(
            store.read_hash("alice").await,
            Err(IconStoreError::NotFound(_))
        ));
        assert!(matches!(
            store.read_icon("alice").await,
            Err(IconStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsIconStore::new(dir.path().join("icons"));

        let hash = store
            .write_icon("alice", Bytes::from_static(b"first"))
            .await
            .unwrap();
        assert_eq!(hash, IconHash::of(b"first"));
        assert_eq!(store.read_hash("alice").await.unwrap(), hash);

        let replaced = store
            .write_icon("alice", Bytes::from_static(b"second"))
            .await
            .unwrap();
        let icon = store.read_icon("alice").await.unwrap();
        assert_eq!(icon.bytes, Bytes::from_static(b"second"));
        assert_eq!(icon.hash, replaced);
        assert_ne!(replaced, hash);

        // no temp files left behind
        let mut names = Vec::new();
        let mut entries = fs::read_dir(dir.path().join("icons/alice")).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        assert_eq!(names, vec!["icon", "icon.hash"]);
    }

    #[tokio::test]
    async fn test_invalid_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsIconStore::new(dir.path().to_path_buf());

        assert!(matches!(
            store.write_icon("../escape", Bytes::from_static(b"x")).await,
            Err(IconStoreError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_removes_user_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsIconStore::new(dir.path().to_path_buf());
        store.write_icon("alice", Bytes::from_static(b"a")).await.unwrap();
        store.write_icon("bob", Bytes::from_static(b"b")).await.unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(matches!(
            store.read_hash("alice").await,
            Err(IconStoreError::NotFound(_))
        ));

        let missing_root = FsIconStore::new(dir.path().join("missing"));
        assert_eq!(missing_root.clear().await.unwrap(), 0);
    }
}
