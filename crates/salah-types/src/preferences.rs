//! Per-visitor preference types

use crate::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a stored or submitted enum value is not recognised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Colour theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(UnknownVariant {
                kind: "theme",
                value: other.to_string(),
            }),
        }
    }
}

/// Interface language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Zh,
    Hi,
    Es,
    Fr,
    Ar,
    Bn,
    #[default]
    Ru,
    Pt,
    Id,
    Ur,
    De,
}

impl Language {
    pub const ALL: [Language; 12] = [
        Language::En,
        Language::Zh,
        Language::Hi,
        Language::Es,
        Language::Fr,
        Language::Ar,
        Language::Bn,
        Language::Ru,
        Language::Pt,
        Language::Id,
        Language::Ur,
        Language::De,
    ];

    /// Two-letter code
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
            Language::Hi => "hi",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::Ar => "ar",
            Language::Bn => "bn",
            Language::Ru => "ru",
            Language::Pt => "pt",
            Language::Id => "id",
            Language::Ur => "ur",
            Language::De => "de",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.code() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "language",
                value: s.to_string(),
            })
    }
}

/// Stored preferences for one client address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub id: RecordId,
    pub ip_address: String,
    pub location: Option<String>,
    pub method: Option<i32>,
    pub theme: Theme,
    pub language: Language,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Preferences creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserPreferences {
    pub ip_address: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub method: Option<i32>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub language: Language,
}

impl NewUserPreferences {
    /// Defaults for an address seen for the first time
    pub fn for_address(ip_address: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            location: None,
            method: None,
            theme: Theme::default(),
            language: Language::default(),
        }
    }

    /// Attach identity and stamp both timestamps with `now`
    pub fn into_record(self, id: RecordId, now: DateTime<Utc>) -> UserPreferences {
        UserPreferences {
            id,
            ip_address: self.ip_address,
            location: self.location,
            method: self.method,
            theme: self.theme,
            language: self.language,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial preferences update. `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferencesPatch {
    pub ip_address: Option<String>,
    pub location: Option<String>,
    pub method: Option<i32>,
    pub theme: Option<Theme>,
    pub language: Option<Language>,
}

impl UserPreferencesPatch {
    pub fn is_empty(&self) -> bool {
        self.ip_address.is_none()
            && self.location.is_none()
            && self.method.is_none()
            && self.theme.is_none()
            && self.language.is_none()
    }

    /// Merge the supplied fields over a stored record. Timestamps are the
    /// caller's business.
    pub fn apply(self, prefs: &mut UserPreferences) {
        if let Some(ip_address) = self.ip_address {
            prefs.ip_address = ip_address;
        }
        if let Some(location) = self.location {
            prefs.location = Some(location);
        }
        if let Some(method) = self.method {
            prefs.method = Some(method);
        }
        if let Some(theme) = self.theme {
            prefs.theme = theme;
        }
        if let Some(language) = self.language {
            prefs.language = language;
        }
    }

    /// Merge the supplied fields over a creation request
    pub fn overlay(self, mut base: NewUserPreferences) -> NewUserPreferences {
        if let Some(ip_address) = self.ip_address {
            base.ip_address = ip_address;
        }
        if let Some(location) = self.location {
            base.location = Some(location);
        }
        if let Some(method) = self.method {
            base.method = Some(method);
        }
        if let Some(theme) = self.theme {
            base.theme = theme;
        }
        if let Some(language) = self.language {
            base.language = language;
        }
        base
    }
}
