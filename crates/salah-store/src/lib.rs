//! Storage layer
//!
//! `MemStorage` keeps everything in memory and is the default. `SqliteStorage`
//! offers the same contract on SQLite (embedded). Both are handed out as
//! `Arc<dyn Storage>` so callers never depend on a concrete backend.

pub mod db;
pub mod memory;
pub mod services;

pub use db::SqliteStorage;
pub use memory::MemStorage;
pub use services::{PrayerTimesService, PrayerTimesSource, PreferenceService, ServiceError};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use salah_core::{Backend, Result, Storage, StorageConfig};
use std::sync::Arc;
use tracing::info;

/// Build the configured backend
pub async fn open_storage(config: &StorageConfig) -> Result<Arc<dyn Storage>> {
    match config.backend {
        Backend::Memory => {
            info!("Using in-memory storage");
            Ok(Arc::new(MemStorage::new()))
        }
        Backend::Sqlite => Ok(Arc::new(SqliteStorage::new(config).await?)),
    }
}

/// Current time at the precision every backend can hold
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// New `updated_at` for a record last touched at `previous`. Always strictly
/// later, even when the clock has not moved.
pub(crate) fn touch_stamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    now().max(previous + Duration::microseconds(1))
}
