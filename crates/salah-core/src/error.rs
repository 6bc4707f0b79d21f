//! Error types for the storage layer
//!
//! Absence is never an error: lookups return `Ok(None)` so callers can tell
//! "nothing there" apart from "storage broken".

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for StorageError {
    fn from(e: config::ConfigError) -> Self {
        StorageError::Config(e.to_string())
    }
}

impl From<salah_types::UnknownVariant> for StorageError {
    fn from(e: salah_types::UnknownVariant) -> Self {
        StorageError::Corrupt(e.to_string())
    }
}
