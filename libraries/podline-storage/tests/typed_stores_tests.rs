//! Integration tests for the typed per-component stores

mod test_helpers;

use chrono::{TimeZone, Utc};
use podline_core::types::*;
use podline_storage::{
    keys, DownloadStore, HistoryStore, KeyValueStore, MemoryKeyValueStore, NowPlayingStore,
    QueueStore, SettingsStore,
};
use std::sync::Arc;
use test_helpers::*;

fn memory() -> Arc<MemoryKeyValueStore> {
    Arc::new(MemoryKeyValueStore::new())
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn test_history_round_trip_on_sqlite() {
    let test_db = TestDb::new().await;
    let store = HistoryStore::new(test_db.kv());

    let items = vec![history_record("a", 10.0), history_record("b", 20.0)];
    store.save(&items).await.unwrap();

    assert_eq!(store.load().await.unwrap(), items);

    store.clear().await.unwrap();
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_history_reads_as_empty() {
    let kv = memory();
    kv.set(keys::HISTORY_ITEMS, "{not json").await.unwrap();

    let store = HistoryStore::new(kv);
    assert!(store.load().await.unwrap().is_empty());
}

// =============================================================================
// Now playing
// =============================================================================

#[tokio::test]
async fn test_now_playing_and_clip_flag() {
    let store = NowPlayingStore::new(memory());

    assert!(store.load().await.unwrap().is_none());
    assert!(!store.clip_has_ended().await.unwrap());

    let item = test_episode("ep-1");
    store.save(&item).await.unwrap();
    store.set_clip_has_ended(true).await.unwrap();

    assert_eq!(store.load().await.unwrap(), Some(item));
    assert!(store.clip_has_ended().await.unwrap());

    store.set_clip_has_ended(false).await.unwrap();
    store.clear().await.unwrap();
    assert!(!store.clip_has_ended().await.unwrap());
    assert!(store.load().await.unwrap().is_none());
}

// =============================================================================
// Queue
// =============================================================================

#[tokio::test]
async fn test_queue_preserves_order() {
    let store = QueueStore::new(memory());
    let items = vec![test_episode("3"), test_episode("1"), test_episode("2")];

    store.save(&items).await.unwrap();

    let loaded = store.load().await.unwrap();
    let ids: Vec<_> = loaded
        .iter()
        .map(|i| i.episode_id.clone().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["3", "1", "2"]);
}

// =============================================================================
// Downloads
// =============================================================================

#[tokio::test]
async fn test_download_records_and_policy() {
    let store = DownloadStore::new(memory());
    let record = DownloadRecord {
        episode_id: EpisodeId::new("ep-1"),
        podcast_key: "pod-1".into(),
        is_downloading: false,
        is_downloaded: true,
        pub_date: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        downloaded_at: None,
        file_path: None,
    };

    store.upsert_record(record.clone()).await.unwrap();
    assert_eq!(store.record(&EpisodeId::new("ep-1")).await.unwrap(), Some(record));

    store.set_auto_download("pod-1", true).await.unwrap();
    store.set_auto_download("pod-2", false).await.unwrap();
    assert_eq!(store.auto_download_podcasts().await.unwrap(), vec!["pod-1".to_string()]);

    store.remove_auto_download("pod-1").await.unwrap();
    assert!(store.auto_download_podcasts().await.unwrap().is_empty());

    assert!(store.remove_record(&EpisodeId::new("ep-1")).await.unwrap().is_some());
    assert!(store.records().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_episode_limit_falls_back_to_default() {
    let store = DownloadStore::new(memory());

    assert_eq!(store.episode_limit("pod-1").await.unwrap(), 0);

    store.set_default_episode_limit(5).await.unwrap();
    store.set_episode_limit("pod-2", 2).await.unwrap();

    assert_eq!(store.episode_limit("pod-1").await.unwrap(), 5);
    assert_eq!(store.episode_limit("pod-2").await.unwrap(), 2);
}

#[tokio::test]
async fn test_last_refreshed_round_trip() {
    let store = DownloadStore::new(memory());
    assert!(store.last_refreshed().await.unwrap().is_none());

    let at = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
    store.set_last_refreshed(at).await.unwrap();
    assert_eq!(store.last_refreshed().await.unwrap(), Some(at));
}

// =============================================================================
// Settings
// =============================================================================

#[tokio::test]
async fn test_settings_defaults() {
    let settings = SettingsStore::new(memory());

    assert_eq!(settings.jump_backwards_seconds().await.unwrap(), 10);
    assert_eq!(settings.jump_forwards_seconds().await.unwrap(), 30);
    assert_eq!(settings.playback_speed().await.unwrap(), 1.0);
    assert!(!settings.downloading_wifi_only().await.unwrap());
    assert!(!settings.offline_mode().await.unwrap());
    assert_eq!(
        settings.auto_queue_position().await.unwrap(),
        AutoQueuePosition::Last
    );
}

#[tokio::test]
async fn test_zero_jump_resets_to_default() {
    let settings = SettingsStore::new(memory());

    settings.set_jump_backwards_seconds(25).await.unwrap();
    assert_eq!(settings.jump_backwards_seconds().await.unwrap(), 25);

    settings.set_jump_backwards_seconds(0).await.unwrap();
    assert_eq!(settings.jump_backwards_seconds().await.unwrap(), 10);
}

#[tokio::test]
async fn test_invalid_stored_speed_uses_default() {
    let kv = memory();
    kv.set(keys::PLAYBACK_SPEED, "-3").await.unwrap();

    let settings = SettingsStore::new(kv);
    assert_eq!(settings.playback_speed().await.unwrap(), 1.0);
}

#[tokio::test]
async fn test_auto_queue_flags() {
    let settings = SettingsStore::new(memory());

    settings.set_auto_queue("pod-1", true).await.unwrap();
    settings
        .set_auto_queue_position(AutoQueuePosition::First)
        .await
        .unwrap();

    assert!(settings.is_auto_queue_enabled("pod-1").await.unwrap());
    assert!(!settings.is_auto_queue_enabled("pod-2").await.unwrap());
    assert_eq!(
        settings.auto_queue_position().await.unwrap(),
        AutoQueuePosition::First
    );
}
