//! Row models for the transactional store and the assembled profile served
//! to request handlers.

use serde::{Deserialize, Serialize};

/// A row of the `users` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserModel {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: String,
}

/// A row of the `themes` table, one per user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeModel {
    pub id: i64,
    pub user_id: i64,
    pub dark_mode: bool,
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub theme: NewUserTheme,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUserTheme {
    pub dark_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: i64,
    pub dark_mode: bool,
}

/// Fully assembled user profile
///
/// Derived from a user row, its theme row and the current icon hash. Never
/// the source of truth: it can be rebuilt from storage at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub theme: Theme,
    pub icon_hash: String,
}

impl UserProfile {
    pub fn assemble(user: UserModel, theme: &ThemeModel, icon_hash: String) -> Self {
        Self {
            id: user.id,
            name: user.name,
            display_name: user.display_name,
            description: user.description,
            theme: Theme {
                id: theme.id,
                dark_mode: theme.dark_mode,
            },
            icon_hash,
        }
    }
}
