//! Salah Core Library
//!
//! Store contracts, error taxonomy and configuration for the prayer times
//! storage layer. Backends live in `salah-store`.

// Re-export pure types from salah-types
pub use salah_types::*;

pub mod config;
pub mod error;
pub mod ports;

pub use crate::config::{AppConfig, Backend, CacheConfig, StorageConfig, MAX_TTL_SECS};
pub use error::{Result, StorageError};
pub use ports::{PrayerTimesCacheStore, PreferenceStore, Storage, UserStore};
