//! In-memory storage (reference backend)
//!
//! Each store keeps its rows, identity counter and lookup index behind one
//! lock, so id assignment and insertion are a single step. Nothing is ever
//! removed: expired cache entries stay and are filtered at read time.

use crate::{now, touch_stamp};
use async_trait::async_trait;
use salah_core::{
    NewPrayerTimesCache, NewUser, NewUserPreferences, PrayerTimesCacheEntry,
    PrayerTimesCacheStore, PrayerTimesKey, PreferenceStore, RecordId, Result, User, UserPreferences,
    UserPreferencesPatch, UserStore,
};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use tokio::sync::RwLock;
use tracing::debug;

/// A record with a secondary lookup key
trait Keyed {
    type Key: Hash + Eq + Clone;

    fn id(&self) -> RecordId;
    fn lookup_key(&self) -> Self::Key;
}

impl Keyed for User {
    type Key = String;

    fn id(&self) -> RecordId {
        self.id
    }

    fn lookup_key(&self) -> String {
        self.username.clone()
    }
}

impl Keyed for UserPreferences {
    type Key = String;

    fn id(&self) -> RecordId {
        self.id
    }

    fn lookup_key(&self) -> String {
        self.ip_address.clone()
    }
}

impl Keyed for PrayerTimesCacheEntry {
    type Key = PrayerTimesKey;

    fn id(&self) -> RecordId {
        self.id
    }

    fn lookup_key(&self) -> PrayerTimesKey {
        self.key()
    }
}

/// Rows ordered by id plus a key -> ascending ids index
struct Table<R: Keyed> {
    next_id: RecordId,
    rows: BTreeMap<RecordId, R>,
    index: HashMap<R::Key, Vec<RecordId>>,
}

impl<R: Keyed> Table<R> {
    fn new() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    fn insert_with(&mut self, build: impl FnOnce(RecordId) -> R) -> &R {
        let id = self.next_id;
        self.next_id += 1;

        let row = build(id);
        // ids only grow, so pushing keeps each list sorted
        self.index.entry(row.lookup_key()).or_default().push(id);
        self.rows.entry(id).or_insert(row)
    }

    fn get(&self, id: RecordId) -> Option<&R> {
        self.rows.get(&id)
    }

    /// Rows carrying `key`, lowest id first
    fn matching<'a>(&'a self, key: &R::Key) -> impl Iterator<Item = &'a R> + 'a {
        self.index
            .get(key)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.rows.get(id))
    }

    /// Overwrite an existing row, moving it in the index if its key changed
    fn replace(&mut self, row: R) {
        let id = row.id();
        let new_key = row.lookup_key();

        match self.rows.insert(id, row) {
            Some(old) => {
                let old_key = old.lookup_key();
                if old_key != new_key {
                    self.unindex(&old_key, id);
                    self.index_sorted(new_key, id);
                }
            }
            None => self.index_sorted(new_key, id),
        }
    }

    fn index_sorted(&mut self, key: R::Key, id: RecordId) {
        let ids = self.index.entry(key).or_default();
        if let Err(pos) = ids.binary_search(&id) {
            ids.insert(pos, id);
        }
    }

    fn unindex(&mut self, key: &R::Key, id: RecordId) {
        if let Some(ids) = self.index.get_mut(key) {
            ids.retain(|existing| *existing != id);
            if ids.is_empty() {
                self.index.remove(key);
            }
        }
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

/// In-memory storage for users, preferences and cached prayer times
pub struct MemStorage {
    users: RwLock<Table<User>>,
    preferences: RwLock<Table<UserPreferences>>,
    prayer_times: RwLock<Table<PrayerTimesCacheEntry>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(Table::new()),
            preferences: RwLock::new(Table::new()),
            prayer_times: RwLock::new(Table::new()),
        }
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Number of stored preference rows, duplicates included
    pub async fn preferences_count(&self) -> usize {
        self.preferences.read().await.len()
    }

    /// Number of stored cache entries, expired ones included
    pub async fn prayer_times_count(&self) -> usize {
        self.prayer_times.read().await.len()
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemStorage {
    async fn get_user(&self, id: RecordId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        let found = users.matching(&username.to_string()).next().cloned();
        Ok(found)
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;
        let user = users.insert_with(|id| user.into_user(id)).clone();
        debug!("Created user: id={}, username={}", user.id, user.username);
        Ok(user)
    }
}

#[async_trait]
impl PreferenceStore for MemStorage {
    async fn get_user_preferences(&self, ip_address: &str) -> Result<Option<UserPreferences>> {
        let preferences = self.preferences.read().await;
        let found = preferences.matching(&ip_address.to_string()).next().cloned();
        Ok(found)
    }

    async fn create_user_preferences(&self, prefs: NewUserPreferences) -> Result<UserPreferences> {
        let mut preferences = self.preferences.write().await;
        let created_at = now();
        let prefs = preferences
            .insert_with(|id| prefs.into_record(id, created_at))
            .clone();
        debug!(
            "Created preferences: id={}, ip={}",
            prefs.id, prefs.ip_address
        );
        Ok(prefs)
    }

    async fn update_user_preferences(
        &self,
        ip_address: &str,
        patch: UserPreferencesPatch,
    ) -> Result<Option<UserPreferences>> {
        let mut preferences = self.preferences.write().await;

        let Some(mut updated) = preferences.matching(&ip_address.to_string()).next().cloned()
        else {
            return Ok(None);
        };

        let previous = updated.updated_at;
        patch.apply(&mut updated);
        updated.updated_at = touch_stamp(previous);

        preferences.replace(updated.clone());
        debug!("Updated preferences: id={}, ip={}", updated.id, ip_address);
        Ok(Some(updated))
    }
}

#[async_trait]
impl PrayerTimesCacheStore for MemStorage {
    async fn get_prayer_times_cache(
        &self,
        location: &str,
        date: &str,
        method: i32,
    ) -> Result<Option<PrayerTimesCacheEntry>> {
        let key = PrayerTimesKey::new(location, date, method);
        let read_at = now();

        let prayer_times = self.prayer_times.read().await;
        let entry = prayer_times
            .matching(&key)
            .find(|entry| entry.is_live_at(read_at))
            .cloned();

        match &entry {
            Some(entry) => debug!("Prayer times cache hit: key={}, id={}", key, entry.id),
            None => debug!("Prayer times cache miss: key={}", key),
        }
        Ok(entry)
    }

    async fn create_prayer_times_cache(
        &self,
        entry: NewPrayerTimesCache,
    ) -> Result<PrayerTimesCacheEntry> {
        let mut prayer_times = self.prayer_times.write().await;
        let created_at = now();
        let entry = prayer_times
            .insert_with(|id| entry.into_entry(id, created_at))
            .clone();
        debug!(
            "Cached prayer times: id={}, key={}, expires_at={}",
            entry.id,
            entry.key(),
            entry.expires_at
        );
        Ok(entry)
    }
}
