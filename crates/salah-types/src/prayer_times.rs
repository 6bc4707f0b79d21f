//! Prayer times cache types

use crate::RecordId;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Natural key of a cached computation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrayerTimesKey {
    pub location: String,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    /// Computation method identifier
    pub method: i32,
}

impl PrayerTimesKey {
    pub fn new(location: impl Into<String>, date: impl Into<String>, method: i32) -> Self {
        Self {
            location: location.into(),
            date: date.into(),
            method,
        }
    }
}

impl std::fmt::Display for PrayerTimesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.location, self.date, self.method)
    }
}

/// Memoized prayer times for one location, date and method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerTimesCacheEntry {
    pub id: RecordId,
    pub location: String,
    pub date: String,
    pub method: i32,
    /// Computed timings, opaque to the store
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PrayerTimesCacheEntry {
    pub fn key(&self) -> PrayerTimesKey {
        PrayerTimesKey::new(self.location.clone(), self.date.clone(), self.method)
    }

    /// Live entries are strictly before their expiry
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Cache entry creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrayerTimesCache {
    pub location: String,
    pub date: String,
    pub method: i32,
    pub payload: serde_json::Value,
    pub expires_at: DateTime<Utc>,
}

impl NewPrayerTimesCache {
    /// Build a request that expires `ttl` from now. A lifetime past the end
    /// of representable time never expires.
    pub fn with_ttl(key: PrayerTimesKey, payload: serde_json::Value, ttl: Duration) -> Self {
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            location: key.location,
            date: key.date,
            method: key.method,
            payload,
            expires_at,
        }
    }

    /// Stored entry; `expires_at` is kept to the microsecond like every
    /// other timestamp.
    pub fn into_entry(self, id: RecordId, now: DateTime<Utc>) -> PrayerTimesCacheEntry {
        PrayerTimesCacheEntry {
            id,
            location: self.location,
            date: self.date,
            method: self.method,
            payload: self.payload,
            created_at: now,
            expires_at: self.expires_at.trunc_subsecs(6),
        }
    }
}
