//! User types

use crate::RecordId;
use serde::{Deserialize, Serialize};

/// User account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub username: String,
    /// Opaque to the store; callers hash before handing it over.
    pub password: String,
}

/// User creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
}

impl NewUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Attach the store-assigned identity
    pub fn into_user(self, id: RecordId) -> User {
        User {
            id,
            username: self.username,
            password: self.password,
        }
    }
}
