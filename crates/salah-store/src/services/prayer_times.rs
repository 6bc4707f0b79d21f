//! Prayer times service
//!
//! Serves computed prayer times from the cache and falls back to an external
//! source on a miss. Lifetime of new entries and the source timeout come from
//! [`CacheConfig`].

use super::ServiceError;
use async_trait::async_trait;
use salah_core::{
    CacheConfig, NewPrayerTimesCache, PrayerTimesCacheEntry, PrayerTimesKey, Storage, StorageError,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Computes prayer times for a key (upstream API, local calculator, ...)
#[async_trait]
pub trait PrayerTimesSource: Send + Sync {
    async fn compute(&self, key: &PrayerTimesKey) -> anyhow::Result<serde_json::Value>;
}

pub struct PrayerTimesService {
    storage: Arc<dyn Storage>,
    source: Arc<dyn PrayerTimesSource>,
    ttl: chrono::Duration,
    source_timeout: Duration,
}

impl PrayerTimesService {
    pub fn new(
        storage: Arc<dyn Storage>,
        source: Arc<dyn PrayerTimesSource>,
        config: &CacheConfig,
    ) -> salah_core::Result<Self> {
        config.validate()?;
        let ttl = chrono::Duration::from_std(config.ttl())
            .map_err(|e| StorageError::Config(format!("cache.ttl_secs: {}", e)))?;

        Ok(Self {
            storage,
            source,
            ttl,
            source_timeout: config.source_timeout(),
        })
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Cached entry for `key`, computing and caching it on a miss. Nothing
    /// is cached when the source fails.
    pub async fn get_or_compute(
        &self,
        key: &PrayerTimesKey,
    ) -> Result<PrayerTimesCacheEntry, ServiceError> {
        if let Some(entry) = self
            .storage
            .get_prayer_times_cache(&key.location, &key.date, key.method)
            .await?
        {
            debug!("Serving cached prayer times: key={}, id={}", key, entry.id);
            return Ok(entry);
        }

        info!("Computing prayer times: key={}", key);
        let payload = match tokio::time::timeout(self.source_timeout, self.source.compute(key)).await
        {
            Ok(Ok(payload)) => payload,
            Ok(Err(e)) => {
                warn!("Prayer times source failed for {}: {:#}", key, e);
                return Err(ServiceError::Source(e));
            }
            Err(_) => {
                warn!("Prayer times source timed out for {}", key);
                return Err(ServiceError::SourceTimeout(self.source_timeout));
            }
        };

        let entry = self
            .storage
            .create_prayer_times_cache(NewPrayerTimesCache::with_ttl(
                key.clone(),
                payload,
                self.ttl,
            ))
            .await?;
        Ok(entry)
    }
}
