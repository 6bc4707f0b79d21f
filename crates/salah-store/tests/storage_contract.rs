//! Behaviour every backend must share, run against each of them

use chrono::{Duration, Utc};
use salah_core::{
    Backend, Language, NewPrayerTimesCache, NewUser, NewUserPreferences, PrayerTimesCacheStore,
    PrayerTimesKey, Storage, StorageConfig, Theme, UserPreferencesPatch,
};
use salah_store::open_storage;
use serde_json::json;
use std::sync::Arc;

async fn backends() -> Vec<(&'static str, Arc<dyn Storage>)> {
    let memory = open_storage(&StorageConfig::default()).await.unwrap();
    let sqlite = open_storage(&StorageConfig {
        backend: Backend::Sqlite,
        ..StorageConfig::default()
    })
    .await
    .unwrap();
    vec![("memory", memory), ("sqlite", sqlite)]
}

fn visitor(ip: &str) -> NewUserPreferences {
    NewUserPreferences {
        ip_address: ip.to_string(),
        location: Some("Kazan".to_string()),
        method: Some(14),
        theme: Theme::Light,
        language: Language::Ru,
    }
}

#[tokio::test]
async fn user_ids_strictly_increase() {
    for (name, storage) in backends().await {
        let mut last = 0;
        for i in 0..10 {
            let user = storage
                .create_user(NewUser::new(format!("user{}", i), "hash"))
                .await
                .unwrap();
            assert!(user.id > last, "{}: id {} after {}", name, user.id, last);
            last = user.id;
        }
    }
}

#[tokio::test]
async fn username_lookup_never_returns_another_name() {
    for (name, storage) in backends().await {
        storage.create_user(NewUser::new("zayd", "a")).await.unwrap();
        storage.create_user(NewUser::new("zaynab", "b")).await.unwrap();

        let found = storage.get_user_by_username("zaynab").await.unwrap().unwrap();
        assert_eq!(found.username, "zaynab", "{}", name);
        assert!(storage.get_user_by_username("zay").await.unwrap().is_none(), "{}", name);
    }
}

#[tokio::test]
async fn created_preferences_read_back_unchanged() {
    for (name, storage) in backends().await {
        let input = visitor("10.0.0.1");
        let created = storage.create_user_preferences(input.clone()).await.unwrap();
        let read = storage
            .get_user_preferences("10.0.0.1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(read, created, "{}", name);
        assert_eq!(read.ip_address, input.ip_address);
        assert_eq!(read.location, input.location);
        assert_eq!(read.method, input.method);
        assert_eq!(read.theme, input.theme);
        assert_eq!(read.language, input.language);
        assert_eq!(read.created_at, read.updated_at, "{}", name);
    }
}

#[tokio::test]
async fn update_of_unknown_address_creates_nothing() {
    for (name, storage) in backends().await {
        let patch = UserPreferencesPatch {
            theme: Some(Theme::Dark),
            ..Default::default()
        };
        let result = storage
            .update_user_preferences("203.0.113.9", patch)
            .await
            .unwrap();

        assert!(result.is_none(), "{}", name);
        assert!(
            storage.get_user_preferences("203.0.113.9").await.unwrap().is_none(),
            "{}",
            name
        );
    }
}

#[tokio::test]
async fn partial_update_changes_only_supplied_field() {
    for (name, storage) in backends().await {
        let before = storage
            .create_user_preferences(visitor("10.0.0.2"))
            .await
            .unwrap();

        let patch = UserPreferencesPatch {
            language: Some(Language::De),
            ..Default::default()
        };
        storage
            .update_user_preferences("10.0.0.2", patch)
            .await
            .unwrap()
            .unwrap();

        let after = storage
            .get_user_preferences("10.0.0.2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.language, Language::De, "{}", name);
        assert_eq!(after.id, before.id);
        assert_eq!(after.location, before.location);
        assert_eq!(after.method, before.method);
        assert_eq!(after.theme, before.theme);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at, "{}", name);
    }
}

#[tokio::test]
async fn live_cache_entry_is_found() {
    for (name, storage) in backends().await {
        let created = storage
            .create_prayer_times_cache(NewPrayerTimesCache {
                location: "Cairo".to_string(),
                date: "2024-05-01".to_string(),
                method: 3,
                payload: json!({"fajr": "03:43", "maghrib": "18:39"}),
                expires_at: Utc::now() + Duration::seconds(3600),
            })
            .await
            .unwrap();

        let found = storage
            .get_prayer_times_cache("Cairo", "2024-05-01", 3)
            .await
            .unwrap();
        assert_eq!(found, Some(created), "{}", name);
    }
}

#[tokio::test]
async fn expired_cache_entry_is_absent() {
    for (name, storage) in backends().await {
        let key = PrayerTimesKey::new("Cairo", "2024-05-01", 3);
        storage
            .create_prayer_times_cache(NewPrayerTimesCache::with_ttl(
                key,
                json!({}),
                Duration::milliseconds(250),
            ))
            .await
            .unwrap();

        assert!(storage
            .get_prayer_times_cache("Cairo", "2024-05-01", 3)
            .await
            .unwrap()
            .is_some());

        tokio::time::sleep(std::time::Duration::from_millis(400)).await;

        assert!(
            storage
                .get_prayer_times_cache("Cairo", "2024-05-01", 3)
                .await
                .unwrap()
                .is_none(),
            "{}",
            name
        );
    }
}

#[tokio::test]
async fn expired_entry_stays_in_memory_storage() {
    let storage = salah_store::MemStorage::new();
    storage
        .create_prayer_times_cache(NewPrayerTimesCache {
            location: "Cairo".to_string(),
            date: "2024-05-01".to_string(),
            method: 3,
            payload: json!({}),
            expires_at: Utc::now() - Duration::seconds(1),
        })
        .await
        .unwrap();

    assert!(storage
        .get_prayer_times_cache("Cairo", "2024-05-01", 3)
        .await
        .unwrap()
        .is_none());
    assert_eq!(storage.prayer_times_count().await, 1);
}

#[tokio::test]
async fn mismatched_method_is_absent() {
    for (name, storage) in backends().await {
        storage
            .create_prayer_times_cache(NewPrayerTimesCache::with_ttl(
                PrayerTimesKey::new("Cairo", "2024-05-01", 3),
                json!({}),
                Duration::hours(1),
            ))
            .await
            .unwrap();

        assert!(
            storage
                .get_prayer_times_cache("Cairo", "2024-05-01", 2)
                .await
                .unwrap()
                .is_none(),
            "{}",
            name
        );
    }
}

#[tokio::test]
async fn duplicate_addresses_resolve_to_first_created() {
    for (name, storage) in backends().await {
        let first = storage
            .create_user_preferences(visitor("10.0.0.3"))
            .await
            .unwrap();
        let second = storage
            .create_user_preferences(NewUserPreferences {
                theme: Theme::Dark,
                ..visitor("10.0.0.3")
            })
            .await
            .unwrap();
        assert!(second.id > first.id);

        for _ in 0..5 {
            let found = storage
                .get_user_preferences("10.0.0.3")
                .await
                .unwrap()
                .unwrap();
            assert_eq!(found.id, first.id, "{}", name);
        }
    }
}

#[tokio::test]
async fn duplicate_usernames_resolve_to_first_created() {
    for (name, storage) in backends().await {
        let first = storage.create_user(NewUser::new("omar", "one")).await.unwrap();
        let second = storage.create_user(NewUser::new("omar", "two")).await.unwrap();
        assert!(second.id > first.id, "{}", name);

        for _ in 0..5 {
            let found = storage.get_user_by_username("omar").await.unwrap().unwrap();
            assert_eq!(found, first, "{}", name);
        }
    }
}

#[tokio::test]
async fn duplicate_live_cache_entries_resolve_to_first_created() {
    for (name, storage) in backends().await {
        let key = PrayerTimesKey::new("Istanbul", "2024-05-01", 13);
        let first = storage
            .create_prayer_times_cache(NewPrayerTimesCache::with_ttl(
                key.clone(),
                json!({"fajr": "04:12"}),
                Duration::hours(1),
            ))
            .await
            .unwrap();
        let second = storage
            .create_prayer_times_cache(NewPrayerTimesCache::with_ttl(
                key.clone(),
                json!({"fajr": "04:13"}),
                Duration::hours(2),
            ))
            .await
            .unwrap();
        assert!(second.id > first.id, "{}", name);

        for _ in 0..5 {
            let found = storage
                .get_prayer_times_cache(&key.location, &key.date, key.method)
                .await
                .unwrap();
            assert_eq!(found, Some(first.clone()), "{}", name);
        }
    }
}
