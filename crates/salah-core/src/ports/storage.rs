//! Storage traits
//!
//! Three independently keyed stores, each assigning its own strictly
//! increasing integer identities. Lookups by a non-identity key return the
//! lowest-id match; duplicates of those keys are accepted, never rejected.

use crate::Result;
use async_trait::async_trait;
use salah_types::{
    NewPrayerTimesCache, NewUser, NewUserPreferences, PrayerTimesCacheEntry, RecordId, User,
    UserPreferences, UserPreferencesPatch,
};

/// User store
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: RecordId) -> Result<Option<User>>;

    /// First user carrying `username`. Usernames are not unique here.
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn create_user(&self, user: NewUser) -> Result<User>;
}

/// Per-address preference store
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// First record whose address equals `ip_address`
    async fn get_user_preferences(&self, ip_address: &str) -> Result<Option<UserPreferences>>;

    /// Stamps `created_at == updated_at == now`
    async fn create_user_preferences(&self, prefs: NewUserPreferences) -> Result<UserPreferences>;

    /// Merge `patch` into the record `get_user_preferences` would return and
    /// bump `updated_at`. Returns `None`, creating nothing, when no record
    /// exists for the address.
    async fn update_user_preferences(
        &self,
        ip_address: &str,
        patch: UserPreferencesPatch,
    ) -> Result<Option<UserPreferences>>;
}

/// Prayer times cache store
#[async_trait]
pub trait PrayerTimesCacheStore: Send + Sync {
    /// First entry matching the key with `expires_at` after the current
    /// instant. Expired matches are skipped but stay in storage.
    async fn get_prayer_times_cache(
        &self,
        location: &str,
        date: &str,
        method: i32,
    ) -> Result<Option<PrayerTimesCacheEntry>>;

    /// Stamps `created_at = now`; `expires_at` comes from the caller
    async fn create_prayer_times_cache(
        &self,
        entry: NewPrayerTimesCache,
    ) -> Result<PrayerTimesCacheEntry>;
}

/// The storage facade handed to request handlers
pub trait Storage: UserStore + PreferenceStore + PrayerTimesCacheStore {}

impl<T> Storage for T where T: UserStore + PreferenceStore + PrayerTimesCacheStore + ?Sized {}
