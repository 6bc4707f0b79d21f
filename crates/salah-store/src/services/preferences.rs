//! Preference service

use salah_core::{NewUserPreferences, Result, Storage, UserPreferences, UserPreferencesPatch};
use std::sync::Arc;
use tracing::info;

pub struct PreferenceService {
    storage: Arc<dyn Storage>,
}

impl PreferenceService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn load(&self, ip_address: &str) -> Result<Option<UserPreferences>> {
        self.storage.get_user_preferences(ip_address).await
    }

    /// Update the preferences stored for `ip_address`, creating them from
    /// defaults on the first save. The address is the key here, so a patch
    /// cannot move the record to another one.
    ///
    /// The lookup and the create are separate store calls. Two first saves
    /// racing for one address can both create a row; lookups then keep
    /// returning the older one.
    pub async fn save(
        &self,
        ip_address: &str,
        mut patch: UserPreferencesPatch,
    ) -> Result<UserPreferences> {
        patch.ip_address = None;

        if let Some(updated) = self
            .storage
            .update_user_preferences(ip_address, patch.clone())
            .await?
        {
            return Ok(updated);
        }

        info!("First preferences for {}, creating record", ip_address);
        let new = patch.overlay(NewUserPreferences::for_address(ip_address));
        self.storage.create_user_preferences(new).await
    }
}
