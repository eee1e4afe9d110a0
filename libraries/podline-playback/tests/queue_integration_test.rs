//! Queue tests: persistence, auto-queue and ordering properties

mod common;

use chrono::{TimeZone, Utc};
use common::*;
use podline_core::types::{AutoQueuePosition, CatalogEpisode, EpisodeId, MediaType, PodcastSource};
use podline_core::KeyValueStore;
use podline_playback::{EventBus, LoadOptions, QueueManager};
use podline_storage::{MemoryKeyValueStore, QueueStore, SettingsStore};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

fn ids(items: &[podline_core::types::QueueItem]) -> Vec<String> {
    items
        .iter()
        .map(|q| q.item.episode_id.as_ref().map(|e| e.to_string()).unwrap_or_default())
        .collect()
}

fn catalog_episode(id: &str, podcast: &str) -> CatalogEpisode {
    CatalogEpisode {
        episode_id: EpisodeId::new(id),
        source: PodcastSource::catalog(podcast),
        title: Some(format!("Episode {}", id)),
        podcast_title: None,
        media_url: format!("https://cdn.example.com/{}.mp3", id),
        media_type: MediaType::Audio,
        pub_date: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
        duration: Some(1800.0),
    }
}

// ============================================================================
// Through the player
// ============================================================================

#[tokio::test]
async fn test_queue_survives_restart() {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
    let h = HarnessBuilder::new().kv(kv.clone()).start().await;
    h.player.enqueue_last(episode("a")).await.unwrap();
    h.player.enqueue_last(episode("b")).await.unwrap();
    h.player.enqueue_next(episode("c")).await.unwrap();
    h.player.shutdown().unwrap();
    h.task.await.unwrap();

    let h = HarnessBuilder::new().kv(kv).start().await;

    let items = h.player.queue_items().await.unwrap();
    assert_eq!(ids(&items), vec!["c", "a", "b"]);
    assert_eq!(items[2].position, 2);
}

#[tokio::test]
async fn test_loading_queued_item_removes_it() {
    let h = Harness::start().await;
    h.player.enqueue_last(episode("a")).await.unwrap();
    h.player.enqueue_last(episode("b")).await.unwrap();

    h.player
        .load_item(episode("b"), LoadOptions::default())
        .await
        .unwrap();

    assert_eq!(ids(&h.player.queue_items().await.unwrap()), vec!["a"]);
    assert!(h.audio.queued_next().unwrap().is_same_identity(&episode("a")));
}

#[tokio::test]
async fn test_previous_item_goes_next_when_enabled() {
    let h = Harness::start().await;
    SettingsStore::new(h.kv.clone())
        .set_add_current_item_next_in_queue(true)
        .await
        .unwrap();
    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();
    h.audio.set_position(20.0);

    h.player
        .load_item(episode("b"), LoadOptions::default())
        .await
        .unwrap();

    let items = h.player.queue_items().await.unwrap();
    assert_eq!(ids(&items), vec!["a"]);
    assert_eq!(items[0].item.user_playback_position, 20.0);
}

#[tokio::test]
async fn test_remove_and_reorder_through_player() {
    let h = Harness::start().await;
    for id in ["a", "b", "c"] {
        h.player.enqueue_last(episode(id)).await.unwrap();
    }

    assert!(h.player.remove_from_queue(episode_identity("b")).await.unwrap());
    assert!(!h.player.remove_from_queue(episode_identity("b")).await.unwrap());
    h.player.reorder_queue(1, 0).await.unwrap();
    assert!(h.player.reorder_queue(0, 5).await.is_err());

    assert_eq!(ids(&h.player.queue_items().await.unwrap()), vec!["c", "a"]);
}

#[tokio::test]
async fn test_clip_and_episode_queue_separately() {
    let h = Harness::start().await;

    h.player.enqueue_last(episode("a")).await.unwrap();
    h.player
        .enqueue_last(clip("c1", "a", 30.0, Some(60.0)))
        .await
        .unwrap();

    assert_eq!(h.player.queue_items().await.unwrap().len(), 2);
}

// ============================================================================
// Auto-queue
// ============================================================================

#[tokio::test]
async fn test_new_episodes_auto_queue_at_front_in_order() {
    let h = Harness::start().await;
    let settings = SettingsStore::new(h.kv.clone());
    settings.set_auto_queue("pod-1", true).await.unwrap();
    settings
        .set_auto_queue_position(AutoQueuePosition::First)
        .await
        .unwrap();
    h.player.enqueue_last(episode("old")).await.unwrap();

    let added = h
        .player
        .handle_new_episodes(vec![
            catalog_episode("n1", "pod-1"),
            catalog_episode("n2", "pod-1"),
            catalog_episode("other", "pod-2"),
        ])
        .await
        .unwrap();

    assert_eq!(added, 2);
    assert_eq!(
        ids(&h.player.queue_items().await.unwrap()),
        vec!["n1", "n2", "old"]
    );
}

#[tokio::test]
async fn test_new_episodes_auto_queue_at_back_without_duplicates() {
    let h = Harness::start().await;
    SettingsStore::new(h.kv.clone())
        .set_auto_queue("pod-1", true)
        .await
        .unwrap();
    h.player.enqueue_last(episode("n1")).await.unwrap();

    let added = h
        .player
        .handle_new_episodes(vec![catalog_episode("n1", "pod-1"), catalog_episode("n2", "pod-1")])
        .await
        .unwrap();

    assert_eq!(added, 1);
    assert_eq!(ids(&h.player.queue_items().await.unwrap()), vec!["n1", "n2"]);
}

// ============================================================================
// Properties
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Next(u8),
    Last(u8),
    Remove(u8),
    Dequeue,
    Reorder(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8).prop_map(Op::Next),
        (0u8..8).prop_map(Op::Last),
        (0u8..8).prop_map(Op::Remove),
        Just(Op::Dequeue),
        (0usize..10, 0usize..10).prop_map(|(a, b)| Op::Reorder(a, b)),
    ]
}

proptest! {
    /// Property: identities stay unique and the stored queue matches memory
    #[test]
    fn test_queue_identities_stay_unique(ops in prop::collection::vec(op(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        runtime.block_on(async {
            let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
            let store = QueueStore::new(kv.clone());
            let mut queue = QueueManager::load(store.clone(), EventBus::default()).await.unwrap();

            for op in ops {
                match op {
                    Op::Next(n) => queue.enqueue_next(episode(&n.to_string())).await.unwrap(),
                    Op::Last(n) => queue.enqueue_last(episode(&n.to_string())).await.unwrap(),
                    Op::Remove(n) => {
                        queue.remove(&episode_identity(&n.to_string())).await.unwrap();
                    }
                    Op::Dequeue => {
                        queue.dequeue_next().await.unwrap();
                    }
                    Op::Reorder(from, to) => {
                        let _ = queue.reorder(from, to).await;
                    }
                }

                let items = queue.items();
                let unique: HashSet<_> = items.iter().filter_map(|q| q.item.identity()).collect();
                assert_eq!(unique.len(), items.len());
                assert!(items.iter().enumerate().all(|(i, q)| q.position == i));

                let stored = store.load().await.unwrap();
                assert_eq!(stored.len(), items.len());
            }
        });
    }

    /// Property: enqueue_next always leaves the item at the front
    #[test]
    fn test_enqueue_next_puts_item_first(existing in prop::collection::vec(0u8..8, 0..10), n in 0u8..8) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        runtime.block_on(async {
            let store = QueueStore::new(Arc::new(MemoryKeyValueStore::new()));
            let mut queue = QueueManager::load(store, EventBus::default()).await.unwrap();
            for id in existing {
                queue.enqueue_last(episode(&id.to_string())).await.unwrap();
            }

            queue.enqueue_next(episode(&n.to_string())).await.unwrap();

            let front = queue.peek_next().unwrap();
            assert!(front.is_same_identity(&episode(&n.to_string())));
        });
    }
}
