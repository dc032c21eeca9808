//! Read-through user profile cache
//!
//! Process-wide map from user id to assembled [`UserProfile`], built once by
//! the composition root and shared behind an `Arc`. Entries never expire;
//! they are dropped only by [`ProfileCache::invalidate`], which every
//! operation that changes a user's icon, theme or identity must call after
//! its write is durable.
//!
//! The lock guards the map only. A miss is computed without holding it, so
//! slow storage never serializes unrelated lookups. The price is a benign
//! race: an invalidation landing between computing a miss and storing it
//! leaves that stale entry cached until the next invalidation.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use super::profile::ProfileAggregator;
use crate::errors::ProfileResult;
use crate::icons::IconStore;
use crate::models::UserProfile;
use crate::repositories::UserStore;

/// Counters describing cache effectiveness
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

pub struct ProfileCache<S> {
    aggregator: ProfileAggregator<S>,
    entries: RwLock<HashMap<i64, UserProfile>>,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl<S: IconStore> ProfileCache<S> {
    pub fn new(aggregator: ProfileAggregator<S>) -> Self {
        Self {
            aggregator,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    pub fn aggregator(&self) -> &ProfileAggregator<S> {
        &self.aggregator
    }

    /// Profile for `user_id`, computed through `store` on a miss
    pub async fn get<U>(&self, store: &mut U, user_id: i64) -> ProfileResult<UserProfile>
    where
        U: UserStore + ?Sized,
    {
        if let Some(profile) = self.lookup(user_id).await {
            return Ok(profile);
        }

        let profile = self.aggregator.build_profile_by_id(store, user_id).await?;
        self.set(user_id, profile.clone()).await;
        Ok(profile)
    }

    /// Cached profile for `user_id`, recording a hit or a miss
    pub async fn lookup(&self, user_id: i64) -> Option<UserProfile> {
        let cached = self.entries.read().await.get(&user_id).cloned();
        if cached.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Profile cache hit for user {}", user_id);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Profile cache miss for user {}", user_id);
        }
        cached
    }

    /// Cached profile for `user_id` without touching the counters
    pub async fn peek(&self, user_id: i64) -> Option<UserProfile> {
        self.entries.read().await.get(&user_id).cloned()
    }

    /// Unconditionally store `profile` under `user_id`
    pub async fn set(&self, user_id: i64, profile: UserProfile) {
        self.entries.write().await.insert(user_id, profile);
    }

    /// Drop the entry for `user_id`; returns whether one was present
    pub async fn invalidate(&self, user_id: i64) -> bool {
        let removed = self.entries.write().await.remove(&user_id).is_some();
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Invalidated profile cache for user {} (present: {})",
            user_id, removed
        );
        removed
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icons::{FallbackSource, FsIconStore, IconHashResolver};
    use crate::models::Theme;
    use bytes::Bytes;
    use std::sync::Arc;

    fn cache(dir: &std::path::Path) -> ProfileCache<FsIconStore> {
        let resolver = IconHashResolver::new(
            FsIconStore::new(dir.to_path_buf()),
            FallbackSource::Bytes(Bytes::from_static(b"fallback")),
        );
        ProfileCache::new(ProfileAggregator::new(Arc::new(resolver)))
    }

    fn profile(id: i64, name: &str) -> UserProfile {
        UserProfile {
            id,
            name: name.to_string(),
            display_name: String::new(),
            description: String::new(),
            theme: Theme {
                id,
                dark_mode: false,
            },
            icon_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_set_overwrites_and_invalidate_removes() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        assert!(cache.is_empty().await);

        cache.set(1, profile(1, "alice")).await;
        cache.set(1, profile(1, "alicia")).await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.peek(1).await.unwrap().name, "alicia");

        assert!(cache.invalidate(1).await);
        assert!(!cache.invalidate(1).await);
        assert!(cache.peek(1).await.is_none());
    }

    #[tokio::test]
    async fn test_lookup_counts_hits_and_misses() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        cache.set(1, profile(1, "alice")).await;

        assert!(cache.lookup(1).await.is_some());
        assert!(cache.lookup(2).await.is_none());
        assert!(cache.peek(1).await.is_some());
        cache.invalidate(1).await;

        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                invalidations: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_clear_drops_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        cache.set(1, profile(1, "alice")).await;
        cache.set(2, profile(2, "bob")).await;

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
