//! Services sitting between request handlers and storage

pub mod prayer_times;
pub mod preferences;

pub use prayer_times::{PrayerTimesService, PrayerTimesSource};
pub use preferences::PreferenceService;

use salah_core::StorageError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Prayer times source failed: {0:#}")]
    Source(anyhow::Error),

    #[error("Prayer times source timed out after {0:?}")]
    SourceTimeout(Duration),
}
