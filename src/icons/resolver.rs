use bytes::Bytes;
use std::path::PathBuf;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::hash::IconHash;
use super::store::IconStore;
use crate::errors::{IconStoreError, ProfileError, ProfileResult};

/// Where the shared default icon comes from
#[derive(Debug, Clone)]
pub enum FallbackSource {
    /// Image file read on first use
    Path(PathBuf),
    /// Image bytes already in memory
    Bytes(Bytes),
}

#[derive(Debug)]
struct FallbackIcon {
    bytes: Bytes,
    hash: IconHash,
}

/// Outcome of a conditional icon fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconFetch {
    /// The client already holds the current version; no bytes were read
    NotModified { hash: IconHash },
    /// Full icon bytes and their current version token
    Icon { bytes: Bytes, hash: IconHash },
}

impl IconFetch {
    pub fn hash(&self) -> &IconHash {
        match self {
            Self::NotModified { hash } | Self::Icon { hash, .. } => hash,
        }
    }
}

/// Resolves the current icon hash of a user, falling back to the default icon
///
/// One resolver is built at startup and shared. The fallback image is read
/// and hashed at most once: concurrent first callers wait on the same
/// computation. A failed computation is not remembered, the next caller
/// retries it.
pub struct IconHashResolver<S> {
    store: S,
    fallback_source: FallbackSource,
    fallback: OnceCell<FallbackIcon>,
}

impl<S: IconStore> IconHashResolver<S> {
    pub fn new(store: S, fallback_source: FallbackSource) -> Self {
        Self {
            store,
            fallback_source,
            fallback: OnceCell::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current icon hash for `name`
    ///
    /// A user without a custom icon gets the fallback hash. Any store failure
    /// other than "not found" is returned as an error.
    pub async fn resolve(&self, name: &str) -> ProfileResult<IconHash> {
        match self.store.read_hash(name).await {
            Ok(hash) => Ok(hash),
            Err(IconStoreError::NotFound(_)) => {
                debug!("No custom icon for '{}', using fallback", name);
                Ok(self.fallback().await?.hash.clone())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Hash of the shared fallback image
    pub async fn fallback_hash(&self) -> ProfileResult<IconHash> {
        Ok(self.fallback().await?.hash.clone())
    }

    /// Conditional fetch keyed by the icon hash
    ///
    /// When `if_none_match` designates the current hash the blob bytes are
    /// never read.
    pub async fn fetch(&self, name: &str, if_none_match: Option<&str>) -> ProfileResult<IconFetch> {
        let current = self.resolve(name).await?;
        if if_none_match.is_some_and(|token| current.matches(token)) {
            return Ok(IconFetch::NotModified { hash: current });
        }

        match self.store.read_icon(name).await {
            Ok(icon) => Ok(IconFetch::Icon {
                bytes: icon.bytes,
                hash: icon.hash,
            }),
            Err(IconStoreError::NotFound(_)) => {
                let fallback = self.fallback().await?;
                Ok(IconFetch::Icon {
                    bytes: fallback.bytes.clone(),
                    hash: fallback.hash.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn fallback(&self) -> ProfileResult<&FallbackIcon> {
        self.fallback
            .get_or_try_init(|| async {
                let bytes = match &self.fallback_source {
                    FallbackSource::Bytes(bytes) => bytes.clone(),
                    FallbackSource::Path(path) => {
                        Bytes::from(tokio::fs::read(path).await.map_err(|e| {
                            ProfileError::storage_unavailable(format!(
                                "failed to read fallback icon {}: {}",
                                path.display(),
                                e
                            ))
                        })?)
                    }
                };
                let hash = IconHash::of(&bytes);
                info!("Computed fallback icon hash {}", hash);
                Ok::<_, ProfileError>(FallbackIcon { bytes, hash })
            })
            .await
    }
}
