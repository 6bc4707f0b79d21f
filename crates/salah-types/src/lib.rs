//! Salah Types - Pure record definitions
//!
//! This crate contains only plain data types with no async runtime
//! dependencies. Every store in `salah-core` traffics in these shapes.

pub mod preferences;
pub mod prayer_times;
pub mod user;

pub use preferences::*;
pub use prayer_times::*;
pub use user::*;

/// Store-assigned identity of a record. Unique within its own store.
pub type RecordId = i64;
