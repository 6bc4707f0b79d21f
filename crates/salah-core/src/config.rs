//! Configuration for the storage layer
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `SALAH__*` environment variables (`__` separates sections,
//! e.g. `SALAH__STORAGE__BACKEND=sqlite`).

use crate::error::{Result, StorageError};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SALAH";

/// Longest accepted cache lifetime (ten years)
pub const MAX_TTL_SECS: u64 = 10 * 365 * 86_400;

/// Which backend holds the records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: Backend,
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            database_url: "sqlite::memory:".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of freshly computed prayer times
    pub ttl_secs: u64,
    /// Upper bound on one call to the prayer times source
    pub source_timeout_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ttl_secs == 0 {
            return Err(StorageError::Config(
                "cache.ttl_secs must be positive".to_string(),
            ));
        }
        if self.ttl_secs > MAX_TTL_SECS {
            return Err(StorageError::Config(format!(
                "cache.ttl_secs must not exceed {}",
                MAX_TTL_SECS
            )));
        }
        if self.source_timeout_secs == 0 {
            return Err(StorageError::Config(
                "cache.source_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 86_400,
            source_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load defaults, then `path` if given, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Self::defaults()?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let config: AppConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults overlaid with an inline TOML document
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: AppConfig = Self::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.max_connections == 0 {
            return Err(StorageError::Config(
                "storage.max_connections must be at least 1".to_string(),
            ));
        }
        if self.storage.database_url.is_empty() && self.storage.backend == Backend::Sqlite {
            return Err(StorageError::Config(
                "storage.database_url is required for the sqlite backend".to_string(),
            ));
        }
        self.cache.validate()
    }

    fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>> {
        let storage = StorageConfig::default();
        let cache = CacheConfig::default();
        Ok(Config::builder()
            .set_default("storage.backend", "memory")?
            .set_default("storage.database_url", storage.database_url)?
            .set_default("storage.max_connections", i64::from(storage.max_connections))?
            .set_default("cache.ttl_secs", cache.ttl_secs as i64)?
            .set_default("cache.source_timeout_secs", cache.source_timeout_secs as i64)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.cache.ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_toml_overrides() {
        let config = AppConfig::from_toml_str(
            r#"
            [storage]
            backend = "sqlite"
            database_url = "sqlite://salah.db"

            [cache]
            ttl_secs = 3600
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, Backend::Sqlite);
        assert_eq!(config.storage.database_url, "sqlite://salah.db");
        assert_eq!(config.storage.max_connections, 5);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.cache.source_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_oversized_ttl_rejected() {
        let err = AppConfig::from_toml_str("[cache]\nttl_secs = 10000000000000\n").unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));

        let longest = CacheConfig {
            ttl_secs: MAX_TTL_SECS,
            ..CacheConfig::default()
        };
        assert!(longest.validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let err = AppConfig::from_toml_str("[cache]\nttl_secs = 0\n").unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = AppConfig::from_toml_str("[storage]\nbackend = \"redis\"\n").unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }
}
