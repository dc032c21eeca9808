//! Profile operations exposed to request handlers
//!
//! Each operation opens its own transaction on the [`Database`] and reads
//! through the shared [`ProfileCache`].

use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

use super::profile::ProfileAggregator;
use super::profile_cache::{CacheStats, ProfileCache};
use crate::database::{Database, SqliteUserStore};
use crate::errors::{ProfileError, ProfileResult, RepositoryError};
use crate::icons::{is_valid_icon_key, IconFetch, IconHash, IconHashResolver, IconStore};
use crate::models::{NewUser, UserProfile};
use crate::repositories::UserStore;

/// Names that cannot be registered
const RESERVED_USER_NAMES: &[&str] = &["pipe"];

pub struct ProfileService<S> {
    database: Database,
    icons: Arc<IconHashResolver<S>>,
    cache: Arc<ProfileCache<S>>,
}

impl<S> Clone for ProfileService<S> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            icons: self.icons.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<S: IconStore> ProfileService<S> {
    pub fn new(database: Database, icons: Arc<IconHashResolver<S>>) -> Self {
        let cache = Arc::new(ProfileCache::new(ProfileAggregator::new(icons.clone())));
        Self {
            database,
            icons,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<ProfileCache<S>> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Cached profile of a single user
    ///
    /// A hit is answered without opening a transaction.
    pub async fn get_profile(&self, user_id: i64) -> ProfileResult<UserProfile> {
        if let Some(profile) = self.cache.lookup(user_id).await {
            return Ok(profile);
        }

        let mut tx = self.database.begin().await?;
        let profile = self
            .cache
            .aggregator()
            .build_profile_by_id(&mut SqliteUserStore::new(&mut tx), user_id)
            .await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        self.cache.set(user_id, profile.clone()).await;
        Ok(profile)
    }

    /// Cached profile of the user registered under `name`
    pub async fn get_profile_by_name(&self, name: &str) -> ProfileResult<UserProfile> {
        let mut tx = self.database.begin().await?;
        let mut store = SqliteUserStore::new(&mut tx);
        let user = store
            .find_user_by_name(name)
            .await?
            .ok_or_else(|| ProfileError::not_found("user", name))?;
        let profile = self.cache.get(&mut store, user.id).await?;
        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(profile)
    }

    /// Profiles for `user_ids`, in order, one per entry
    ///
    /// Cached profiles are served directly; the remaining distinct ids are
    /// built with a single batch and stored in the cache.
    pub async fn get_profiles(&self, user_ids: &[i64]) -> ProfileResult<Vec<UserProfile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut resolved: HashMap<i64, UserProfile> = HashMap::with_capacity(user_ids.len());
        let mut misses = Vec::new();
        let mut seen = HashSet::with_capacity(user_ids.len());
        for &id in user_ids {
            if !seen.insert(id) {
                continue;
            }
            match self.cache.lookup(id).await {
                Some(profile) => {
                    resolved.insert(id, profile);
                }
                None => misses.push(id),
            }
        }

        if !misses.is_empty() {
            let mut tx = self.database.begin().await?;
            let built = self
                .cache
                .aggregator()
                .build_profiles(&mut SqliteUserStore::new(&mut tx), &misses)
                .await?;
            tx.commit().await.map_err(RepositoryError::from)?;

            for profile in built {
                self.cache.set(profile.id, profile.clone()).await;
                resolved.insert(profile.id, profile);
            }
        }

        user_ids
            .iter()
            .map(|id| {
                resolved
                    .get(id)
                    .cloned()
                    .ok_or_else(|| ProfileError::not_found("user", id.to_string()))
            })
            .collect()
    }

    /// Create a user and its theme, returning the assembled profile
    pub async fn register(&self, request: NewUser) -> ProfileResult<UserProfile> {
        if RESERVED_USER_NAMES.contains(&request.name.as_str()) {
            return Err(ProfileError::validation(format!(
                "the user name '{}' is reserved",
                request.name
            )));
        }
        if !is_valid_icon_key(&request.name) {
            return Err(ProfileError::validation(format!(
                "invalid user name '{}'",
                request.name
            )));
        }

        let mut tx = self.database.begin().await?;
        let mut store = SqliteUserStore::new(&mut tx);
        let user = store.insert_user(&request).await?;
        store.insert_theme(user.id, request.theme.dark_mode).await?;
        let profile = self.cache.aggregator().build_profile(&mut store, user).await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        info!("Registered user {} ({})", profile.name, profile.id);
        Ok(profile)
    }

    /// Store a new icon for `name` and invalidate the cached profile
    pub async fn replace_icon(&self, name: &str, bytes: Bytes) -> ProfileResult<IconHash> {
        let mut tx = self.database.begin().await?;
        let user = SqliteUserStore::new(&mut tx)
            .find_user_by_name(name)
            .await?
            .ok_or_else(|| ProfileError::not_found("user", name))?;
        tx.commit().await.map_err(RepositoryError::from)?;

        let hash = self.icons.store().write_icon(name, bytes).await?;
        self.on_icon_replaced(user.id).await;

        info!("Replaced icon of user {} ({}): {}", name, user.id, hash);
        Ok(hash)
    }

    /// Invalidation hook; call only after the new icon is durably written
    pub async fn on_icon_replaced(&self, user_id: i64) {
        self.cache.invalidate(user_id).await;
    }

    /// Icon of `name`, or [`IconFetch::NotModified`] when `if_none_match`
    /// already names the current version
    pub async fn fetch_icon(
        &self,
        name: &str,
        if_none_match: Option<&str>,
    ) -> ProfileResult<IconFetch> {
        self.icons.fetch(name, if_none_match).await
    }

    /// Delete every stored icon and every cached profile
    pub async fn reset_icons(&self) -> ProfileResult<usize> {
        let removed = self.icons.store().clear().await?;
        self.cache.clear().await;
        Ok(removed)
    }
}
