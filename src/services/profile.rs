//! Profile aggregation
//!
//! Joins a user row, its theme row and the current icon hash into a
//! [`UserProfile`]. The aggregator holds no state of its own; the store is
//! supplied per call so the caller decides which transaction it reads from.

use futures::future::try_join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

use crate::errors::{ProfileError, ProfileResult};
use crate::icons::{IconHashResolver, IconStore};
use crate::models::{ThemeModel, UserModel, UserProfile};
use crate::repositories::UserStore;

pub struct ProfileAggregator<S> {
    icons: Arc<IconHashResolver<S>>,
}

impl<S> Clone for ProfileAggregator<S> {
    fn clone(&self) -> Self {
        Self {
            icons: self.icons.clone(),
        }
    }
}

fn missing_theme(user_id: i64) -> ProfileError {
    warn!("User {} exists without a theme row", user_id);
    ProfileError::consistency_violation(format!("user {user_id} has no theme"))
}

impl<S: IconStore> ProfileAggregator<S> {
    pub fn new(icons: Arc<IconHashResolver<S>>) -> Self {
        Self { icons }
    }

    pub fn icons(&self) -> &Arc<IconHashResolver<S>> {
        &self.icons
    }

    /// Assemble the profile of an already loaded user row
    pub async fn build_profile<U>(&self, store: &mut U, user: UserModel) -> ProfileResult<UserProfile>
    where
        U: UserStore + ?Sized,
    {
        let theme = store
            .find_theme_by_user_id(user.id)
            .await?
            .ok_or_else(|| missing_theme(user.id))?;
        let icon_hash = self.icons.resolve(&user.name).await?;

        Ok(UserProfile::assemble(user, &theme, icon_hash.into_string()))
    }

    /// Load the user row for `user_id` and assemble its profile
    pub async fn build_profile_by_id<U>(
        &self,
        store: &mut U,
        user_id: i64,
    ) -> ProfileResult<UserProfile>
    where
        U: UserStore + ?Sized,
    {
        let user = store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ProfileError::not_found("user", user_id.to_string()))?;

        self.build_profile(store, user).await
    }

    /// Assemble one profile per entry of `user_ids`, in the same order
    ///
    /// Users and themes are fetched with one query each, and the icon hash of
    /// every distinct name is resolved once. Any identifier without a user
    /// row or theme row fails the whole batch.
    pub async fn build_profiles<U>(
        &self,
        store: &mut U,
        user_ids: &[i64],
    ) -> ProfileResult<Vec<UserProfile>>
    where
        U: UserStore + ?Sized,
    {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::with_capacity(user_ids.len());
        let distinct: Vec<i64> = user_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        let users: HashMap<i64, UserModel> = store
            .find_users_by_ids(&distinct)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();
        let themes: HashMap<i64, ThemeModel> = store
            .find_themes_by_user_ids(&distinct)
            .await?
            .into_iter()
            .map(|theme| (theme.user_id, theme))
            .collect();

        for id in &distinct {
            if !users.contains_key(id) {
                return Err(ProfileError::not_found("user", id.to_string()));
            }
            if !themes.contains_key(id) {
                return Err(missing_theme(*id));
            }
        }

        let names: HashSet<&str> = users.values().map(|user| user.name.as_str()).collect();
        let resolved = try_join_all(names.into_iter().map(|name| async move {
            let hash = self.icons.resolve(name).await?;
            Ok::<_, ProfileError>((name, hash.into_string()))
        }))
        .await?;
        let icon_hashes: HashMap<&str, String> = resolved.into_iter().collect();

        let mut profiles = Vec::with_capacity(user_ids.len());
        for id in user_ids {
            let user = &users[id];
            profiles.push(UserProfile::assemble(
                user.clone(),
                &themes[id],
                icon_hashes[user.name.as_str()].clone(),
            ));
        }

        Ok(profiles)
    }
}
