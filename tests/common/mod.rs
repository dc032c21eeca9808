//! In-memory fakes of the storage collaborators that count every access

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use user_profiles::errors::{IconStoreError, IconStoreResult, RepositoryError, RepositoryResult};
use user_profiles::icons::{IconHash, IconStore, StoredIcon};
use user_profiles::models::{NewUser, ThemeModel, UserModel};
use user_profiles::repositories::UserStore;

pub const FALLBACK_ICON: &[u8] = b"\xff\xd8\xff\xe0 default icon";

#[derive(Default)]
struct Tables {
    users: HashMap<i64, UserModel>,
    themes: HashMap<i64, ThemeModel>,
    next_id: i64,
}

/// Shared-state user store; clones see the same tables and counters
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    tables: Arc<Mutex<Tables>>,
    calls: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user with a theme, bypassing the counters
    pub fn seed_user(&self, name: &str, dark_mode: bool) -> i64 {
        let id = self.seed_user_without_theme(name);
        let mut tables = self.tables.lock().unwrap();
        tables.themes.insert(
            id,
            ThemeModel {
                id: id + 100,
                user_id: id,
                dark_mode,
            },
        );
        id
    }

    pub fn seed_user_without_theme(&self, name: &str) -> i64 {
        let mut tables = self.tables.lock().unwrap();
        tables.next_id += 1;
        let id = tables.next_id;
        tables.users.insert(
            id,
            UserModel {
                id,
                name: name.to_string(),
                display_name: format!("{name} display"),
                description: format!("about {name}"),
            },
        );
        id
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn enter(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Tables>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
        }
        Ok(self.tables.lock().unwrap())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_user_by_id(&mut self, id: i64) -> RepositoryResult<Option<UserModel>> {
        Ok(self.enter()?.users.get(&id).cloned())
    }

    async fn find_user_by_name(&mut self, name: &str) -> RepositoryResult<Option<UserModel>> {
        Ok(self
            .enter()?
            .users
            .values()
            .find(|user| user.name == name)
            .cloned())
    }

    async fn find_theme_by_user_id(
        &mut self,
        user_id: i64,
    ) -> RepositoryResult<Option<ThemeModel>> {
        Ok(self.enter()?.themes.get(&user_id).cloned())
    }

    async fn find_users_by_ids(&mut self, ids: &[i64]) -> RepositoryResult<Vec<UserModel>> {
        let tables = self.enter()?;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }

    async fn find_themes_by_user_ids(
        &mut self,
        user_ids: &[i64],
    ) -> RepositoryResult<Vec<ThemeModel>> {
        let tables = self.enter()?;
        Ok(user_ids
            .iter()
            .filter_map(|id| tables.themes.get(id).cloned())
            .collect())
    }

    async fn insert_user(&mut self, user: &NewUser) -> RepositoryResult<UserModel> {
        let mut tables = self.enter()?;
        if tables.users.values().any(|u| u.name == user.name) {
            return Err(RepositoryError::constraint_violation(
                "users.name",
                "duplicate",
            ));
        }
        tables.next_id += 1;
        let model = UserModel {
            id: tables.next_id,
            name: user.name.clone(),
            display_name: user.display_name.clone(),
            description: user.description.clone(),
        };
        tables.users.insert(model.id, model.clone());
        Ok(model)
    }

    async fn insert_theme(
        &mut self,
        user_id: i64,
        dark_mode: bool,
    ) -> RepositoryResult<ThemeModel> {
        let mut tables = self.enter()?;
        let theme = ThemeModel {
            id: user_id + 100,
            user_id,
            dark_mode,
        };
        tables.themes.insert(user_id, theme.clone());
        Ok(theme)
    }
}

/// Icon store that keeps icons in memory and counts hash lookups
#[derive(Clone, Default)]
pub struct MemoryIconStore {
    icons: Arc<Mutex<HashMap<String, Bytes>>>,
    hash_reads: Arc<AtomicUsize>,
    icon_reads: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryIconStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash_reads(&self) -> usize {
        self.hash_reads.load(Ordering::SeqCst)
    }

    pub fn icon_reads(&self) -> usize {
        self.icon_reads.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> IconStoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IconStoreError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "blob backend down",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl IconStore for MemoryIconStore {
    async fn read_hash(&self, name: &str) -> IconStoreResult<IconHash> {
        self.hash_reads.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.icons
            .lock()
            .unwrap()
            .get(name)
            .map(|bytes| IconHash::of(bytes))
            .ok_or_else(|| IconStoreError::NotFound(name.to_string()))
    }

    async fn read_icon(&self, name: &str) -> IconStoreResult<StoredIcon> {
        self.icon_reads.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.icons
            .lock()
            .unwrap()
            .get(name)
            .map(|bytes| StoredIcon {
                bytes: bytes.clone(),
                hash: IconHash::of(bytes),
            })
            .ok_or_else(|| IconStoreError::NotFound(name.to_string()))
    }

    async fn write_icon(&self, name: &str, bytes: Bytes) -> IconStoreResult<IconHash> {
        self.check_available()?;
        let hash = IconHash::of(&bytes);
        self.icons.lock().unwrap().insert(name.to_string(), bytes);
        Ok(hash)
    }

    async fn clear(&self) -> IconStoreResult<usize> {
        let mut icons = self.icons.lock().unwrap();
        let removed = icons.len();
        icons.clear();
        Ok(removed)
    }
}
