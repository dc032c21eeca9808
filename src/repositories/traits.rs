//! Repository trait definitions

use async_trait::async_trait;

use crate::errors::RepositoryResult;
use crate::models::{NewUser, ThemeModel, UserModel};

/// Transactional store holding user and theme rows
///
/// Methods take `&mut self` because implementations run inside a single
/// transaction, so every read sees the caller's current view.
///
/// Point lookups return `Ok(None)` when the row does not exist; `Err` is
/// reserved for failures of the store itself.
#[async_trait]
pub trait UserStore: Send {
    /// Find a user by its numeric identifier
    async fn find_user_by_id(&mut self, id: i64) -> RepositoryResult<Option<UserModel>>;

    /// Find a user by its unique name
    async fn find_user_by_name(&mut self, name: &str) -> RepositoryResult<Option<UserModel>>;

    /// Find the theme row belonging to a user
    async fn find_theme_by_user_id(&mut self, user_id: i64)
        -> RepositoryResult<Option<ThemeModel>>;

    /// Fetch every user whose id is in `ids` with a single query
    ///
    /// Order is unspecified and ids without a row are simply absent.
    async fn find_users_by_ids(&mut self, ids: &[i64]) -> RepositoryResult<Vec<UserModel>>;

    /// Fetch every theme whose user id is in `user_ids` with a single query
    async fn find_themes_by_user_ids(
        &mut self,
        user_ids: &[i64],
    ) -> RepositoryResult<Vec<ThemeModel>>;

    /// Insert a user row
    ///
    /// A duplicate name is reported as a constraint violation.
    async fn insert_user(&mut self, user: &NewUser) -> RepositoryResult<UserModel>;

    /// Insert the theme row for a freshly created user
    async fn insert_theme(&mut self, user_id: i64, dark_mode: bool)
        -> RepositoryResult<ThemeModel>;
}
