//! SQLite storage (embedded, no external dependencies)
//!
//! Same contract as [`MemStorage`](crate::MemStorage). Driver failures map to
//! `StorageError::Unavailable`; rows that cannot be decoded map to
//! `StorageError::Corrupt`. Timestamps are stored as microseconds since the
//! Unix epoch so ordering comparisons happen on integers.

use crate::{now, touch_stamp};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use salah_core::{
    NewPrayerTimesCache, NewUser, NewUserPreferences, PrayerTimesCacheEntry,
    PrayerTimesCacheStore, PreferenceStore, RecordId, Result, StorageConfig, StorageError, User,
    UserPreferences, UserPreferencesPatch, UserStore,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

fn unavailable(e: sqlx::Error) -> StorageError {
    StorageError::Unavailable(e.to_string())
}

fn to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

fn from_micros(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| StorageError::Corrupt(format!("timestamp out of range: {}", micros)))
}

impl SqliteStorage {
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        info!("Opening SQLite database at: {}", config.database_url);

        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| StorageError::Config(format!("invalid database url: {}", e)))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
        if config.database_url.contains(":memory:") {
            // The database lives only as long as a connection does
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(unavailable)?;

        info!("SQLite connection established, creating tables...");
        Self::run_migrations(&pool).await?;
        info!("Database initialization complete");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Open a private in-memory database
    pub async fn in_memory() -> Result<Self> {
        Self::new(&StorageConfig::default()).await
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        // No UNIQUE constraints: duplicate usernames, addresses and cache keys
        // are accepted and lookups return the lowest id.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                password TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(unavailable)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_preferences (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ip_address TEXT NOT NULL,
                location TEXT,
                method INTEGER,
                theme TEXT NOT NULL,
                language TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(unavailable)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prayer_times_cache (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                location TEXT NOT NULL,
                date TEXT NOT NULL,
                method INTEGER NOT NULL,
                payload TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(unavailable)?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_users_username ON users (username)
            "#,
        )
        .execute(pool)
        .await
        .map_err(unavailable)?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_user_preferences_ip ON user_preferences (ip_address)
            "#,
        )
        .execute(pool)
        .await
        .map_err(unavailable)?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_prayer_times_key
            ON prayer_times_cache (location, date, method)
            "#,
        )
        .execute(pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteStorage {
    async fn get_user(&self, id: RecordId) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, password FROM users WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(unavailable)?;

        Ok(row.map(Into::into))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, password FROM users
            WHERE username = ?1
            ORDER BY id ASC LIMIT 1
            "#,
        )
        .bind(username)
        .fetch_optional(&*self.pool)
        .await
        .map_err(unavailable)?;

        Ok(row.map(Into::into))
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (username, password)
            VALUES (?1, ?2)
            RETURNING id, username, password
            "#,
        )
        .bind(&user.username)
        .bind(&user.password)
        .fetch_one(&*self.pool)
        .await
        .map_err(unavailable)?;

        debug!("Created user: id={}, username={}", row.id, row.username);
        Ok(row.into())
    }
}

#[async_trait]
impl PreferenceStore for SqliteStorage {
    async fn get_user_preferences(&self, ip_address: &str) -> Result<Option<UserPreferences>> {
        let row: Option<PreferencesRow> = sqlx::query_as(
            r#"
            SELECT id, ip_address, location, method, theme, language, created_at, updated_at
            FROM user_preferences
            WHERE ip_address = ?1
            ORDER BY id ASC LIMIT 1
            "#,
        )
        .bind(ip_address)
        .fetch_optional(&*self.pool)
        .await
        .map_err(unavailable)?;

        row.map(UserPreferences::try_from).transpose()
    }

    async fn create_user_preferences(&self, prefs: NewUserPreferences) -> Result<UserPreferences> {
        let stamp = to_micros(now());

        let row: PreferencesRow = sqlx::query_as(
            r#"
            INSERT INTO user_preferences
                (ip_address, location, method, theme, language, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            RETURNING id, ip_address, location, method, theme, language, created_at, updated_at
            "#,
        )
        .bind(&prefs.ip_address)
        .bind(&prefs.location)
        .bind(prefs.method)
        .bind(prefs.theme.to_string())
        .bind(prefs.language.to_string())
        .bind(stamp)
        .fetch_one(&*self.pool)
        .await
        .map_err(unavailable)?;

        debug!("Created preferences: id={}, ip={}", row.id, row.ip_address);
        row.try_into()
    }

    async fn update_user_preferences(
        &self,
        ip_address: &str,
        patch: UserPreferencesPatch,
    ) -> Result<Option<UserPreferences>> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        let row: Option<PreferencesRow> = sqlx::query_as(
            r#"
            SELECT id, ip_address, location, method, theme, language, created_at, updated_at
            FROM user_preferences
            WHERE ip_address = ?1
            ORDER BY id ASC LIMIT 1
            "#,
        )
        .bind(ip_address)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unavailable)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut updated: UserPreferences = row.try_into()?;
        let previous = updated.updated_at;
        patch.apply(&mut updated);
        updated.updated_at = touch_stamp(previous);

        sqlx::query(
            r#"
            UPDATE user_preferences
            SET ip_address = ?1, location = ?2, method = ?3, theme = ?4, language = ?5,
                updated_at = ?6
            WHERE id = ?7
            "#,
        )
        .bind(&updated.ip_address)
        .bind(&updated.location)
        .bind(updated.method)
        .bind(updated.theme.to_string())
        .bind(updated.language.to_string())
        .bind(to_micros(updated.updated_at))
        .bind(updated.id)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        tx.commit().await.map_err(unavailable)?;

        debug!("Updated preferences: id={}, ip={}", updated.id, ip_address);
        Ok(Some(updated))
    }
}

#[async_trait]
impl PrayerTimesCacheStore for SqliteStorage {
    async fn get_prayer_times_cache(
        &self,
        location: &str,
        date: &str,
        method: i32,
    ) -> Result<Option<PrayerTimesCacheEntry>> {
        let row: Option<PrayerTimesRow> = sqlx::query_as(
            r#"
            SELECT id, location, date, method, payload, created_at, expires_at
            FROM prayer_times_cache
            WHERE location = ?1 AND date = ?2 AND method = ?3 AND expires_at > ?4
            ORDER BY id ASC LIMIT 1
            "#,
        )
        .bind(location)
        .bind(date)
        .bind(method)
        .bind(to_micros(now()))
        .fetch_optional(&*self.pool)
        .await
        .map_err(unavailable)?;

        match &row {
            Some(row) => debug!(
                "Prayer times cache hit: key={}-{}-{}, id={}",
                location, date, method, row.id
            ),
            None => debug!("Prayer times cache miss: key={}-{}-{}", location, date, method),
        }
        row.map(PrayerTimesCacheEntry::try_from).transpose()
    }

    async fn create_prayer_times_cache(
        &self,
        entry: NewPrayerTimesCache,
    ) -> Result<PrayerTimesCacheEntry> {
        let payload = serde_json::to_string(&entry.payload)?;

        let row: PrayerTimesRow = sqlx::query_as(
            r#"
            INSERT INTO prayer_times_cache
                (location, date, method, payload, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, location, date, method, payload, created_at, expires_at
            "#,
        )
        .bind(&entry.location)
        .bind(&entry.date)
        .bind(entry.method)
        .bind(payload)
        .bind(to_micros(now()))
        .bind(to_micros(entry.expires_at))
        .fetch_one(&*self.pool)
        .await
        .map_err(unavailable)?;

        debug!(
            "Cached prayer times: id={}, key={}-{}-{}",
            row.id, row.location, row.date, row.method
        );
        row.try_into()
    }
}

// Helper structs for sqlx query_as
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password: String,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            username: r.username,
            password: r.password,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PreferencesRow {
    id: i64,
    ip_address: String,
    location: Option<String>,
    method: Option<i32>,
    theme: String,
    language: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<PreferencesRow> for UserPreferences {
    type Error = StorageError;

    fn try_from(r: PreferencesRow) -> Result<Self> {
        Ok(UserPreferences {
            id: r.id,
            ip_address: r.ip_address,
            location: r.location,
            method: r.method,
            theme: r.theme.parse()?,
            language: r.language.parse()?,
            created_at: from_micros(r.created_at)?,
            updated_at: from_micros(r.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PrayerTimesRow {
    id: i64,
    location: String,
    date: String,
    method: i32,
    payload: String,
    created_at: i64,
    expires_at: i64,
}

impl TryFrom<PrayerTimesRow> for PrayerTimesCacheEntry {
    type Error = StorageError;

    fn try_from(r: PrayerTimesRow) -> Result<Self> {
        Ok(PrayerTimesCacheEntry {
            id: r.id,
            location: r.location,
            date: r.date,
            method: r.method,
            payload: serde_json::from_str(&r.payload)?,
            created_at: from_micros(r.created_at)?,
            expires_at: from_micros(r.expires_at)?,
        })
    }
}
