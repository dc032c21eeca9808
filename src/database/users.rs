//! SQLite implementation of [`UserStore`]
//!
//! The store borrows the connection of a transaction owned by the caller, so
//! a whole request (cache miss, batch build, registration) reads and writes
//! through one consistent view:
//!
//! ```rust,ignore
//! let mut tx = database.begin().await?;
//! let profile = cache.get(&mut SqliteUserStore::new(&mut tx), user_id).await?;
//! tx.commit().await?;
//! ```

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqliteConnection};

use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{NewUser, ThemeModel, UserModel};
use crate::repositories::UserStore;

const USER_COLUMNS: &str = "id, name, display_name, description";
const THEME_COLUMNS: &str = "id, user_id, dark_mode";

pub struct SqliteUserStore<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SqliteUserStore<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }
}

fn user_from_row(row: &SqliteRow) -> Result<UserModel, sqlx::Error> {
    Ok(UserModel {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        display_name: row.try_get("display_name")?,
        description: row.try_get("description")?,
    })
}

fn theme_from_row(row: &SqliteRow) -> Result<ThemeModel, sqlx::Error> {
    Ok(ThemeModel {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        dark_mode: row.try_get("dark_mode")?,
    })
}

/// Build `SELECT <columns> FROM <table> WHERE <column> IN (?, ?, ...)`
fn select_in<'a>(
    columns: &str,
    table: &str,
    column: &str,
    ids: &'a [i64],
) -> QueryBuilder<'a, Sqlite> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {columns} FROM {table} WHERE {column} IN ("
    ));
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    builder
}

#[async_trait]
impl UserStore for SqliteUserStore<'_> {
    async fn find_user_by_id(&mut self, id: i64) -> RepositoryResult<Option<UserModel>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_user_by_name(&mut self, name: &str) -> RepositoryResult<Option<UserModel>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE name = ?"))
            .bind(name)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_theme_by_user_id(
        &mut self,
        user_id: i64,
    ) -> RepositoryResult<Option<ThemeModel>> {
        let row = sqlx::query(&format!(
            "SELECT {THEME_COLUMNS} FROM themes WHERE user_id = ?"
        ))
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(row.as_ref().map(theme_from_row).transpose()?)
    }

    async fn find_users_by_ids(&mut self, ids: &[i64]) -> RepositoryResult<Vec<UserModel>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = select_in(USER_COLUMNS, "users", "id", ids)
            .build()
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows.iter().map(user_from_row).collect::<Result<_, _>>()?)
    }

    async fn find_themes_by_user_ids(
        &mut self,
        user_ids: &[i64],
    ) -> RepositoryResult<Vec<ThemeModel>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = select_in(THEME_COLUMNS, "themes", "user_id", user_ids)
            .build()
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows.iter().map(theme_from_row).collect::<Result<_, _>>()?)
    }

    async fn insert_user(&mut self, user: &NewUser) -> RepositoryResult<UserModel> {
        let result = sqlx::query(
            "INSERT INTO users (name, display_name, description) VALUES (?, ?, ?)",
        )
        .bind(&user.name)
        .bind(&user.display_name)
        .bind(&user.description)
        .execute(&mut *self.conn)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(RepositoryError::constraint_violation(
                    "users.name",
                    format!("user name '{}' is already taken", user.name),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(UserModel {
            id: result.last_insert_rowid(),
            name: user.name.clone(),
            display_name: user.display_name.clone(),
            description: user.description.clone(),
        })
    }

    async fn insert_theme(
        &mut self,
        user_id: i64,
        dark_mode: bool,
    ) -> RepositoryResult<ThemeModel> {
        let result = sqlx::query("INSERT INTO themes (user_id, dark_mode) VALUES (?, ?)")
            .bind(user_id)
            .bind(dark_mode)
            .execute(&mut *self.conn)
            .await?;

        Ok(ThemeModel {
            id: result.last_insert_rowid(),
            user_id,
            dark_mode,
        })
    }
}
