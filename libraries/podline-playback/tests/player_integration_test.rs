//! End-to-end tests for the player dispatcher
//!
//! Every test drives a real dispatcher task against fake native players:
//! - Loading, resuming and backend selection
//! - Position flushes on switch, pause and background
//! - Clip boundaries and the clip to episode handoff
//! - Queue advance at the end of an item
//! - Remote control, audio focus and chapters

mod common;

use async_trait::async_trait;
use common::*;
use podline_core::traits::NextEpisodeLookup;
use podline_core::types::{Chapter, NowPlayingItem};
use podline_playback::{
    EngineEvent, LoadOptions, PlaybackError, PlayerEvent, PlayerState, RecordOptions,
    RemoteCommand,
};
use podline_storage::{MemoryKeyValueStore, SettingsStore};
use podline_core::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;

fn drain(rx: &mut tokio::sync::broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn clip_ended_count(events: &[PlayerEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, PlayerEvent::ClipEnded { .. }))
        .count()
}

// ============================================================================
// Loading
// ============================================================================

#[tokio::test]
async fn test_load_plays_on_audio_backend_and_records_history() {
    let h = Harness::start().await;

    h.player
        .load_item(episode("a").with_duration(120.0), LoadOptions::default())
        .await
        .unwrap();

    assert_eq!(h.player.state().await.unwrap(), PlayerState::Playing);
    assert!(h.audio.loaded().is_some());
    assert!(h.video.loaded().is_none());

    let index = h.player.get_history_index().await.unwrap();
    let entry = index.get(&episode_identity("a")).unwrap();
    assert_eq!(entry.user_playback_position, 0.0);
    assert!(!entry.completed);
}

#[tokio::test]
async fn test_load_resumes_from_history() {
    let h = Harness::start().await;
    h.history
        .record_position(&episode("a"), 300.0, Some(1800.0), RecordOptions::default())
        .await
        .unwrap();

    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();

    let now_playing = h.player.now_playing().await.unwrap().unwrap();
    assert_eq!(now_playing.user_playback_position, 300.0);
    assert_eq!(now_playing.duration, Some(1800.0));
    assert_eq!(h.audio.loaded().unwrap().user_playback_position, 300.0);
}

#[tokio::test]
async fn test_completed_episode_restarts_from_zero() {
    let h = Harness::start().await;
    h.history
        .mark_completed(&episode("a"), Some(1800.0))
        .await
        .unwrap();

    h.player
        .load_item(episode("a").with_position(1795.0), LoadOptions::default())
        .await
        .unwrap();

    let now_playing = h.player.now_playing().await.unwrap().unwrap();
    assert_eq!(now_playing.user_playback_position, 1795.0);

    h.player
        .load_item(episode("b"), LoadOptions::default())
        .await
        .unwrap();
    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();
    let now_playing = h.player.now_playing().await.unwrap().unwrap();
    assert_eq!(now_playing.user_playback_position, 0.0);
}

#[tokio::test]
async fn test_invalid_item_is_rejected() {
    let h = Harness::start().await;
    let mut item = episode("a");
    item.media_url = String::new();

    let err = h
        .player
        .load_item(item, LoadOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PlaybackError::InvalidItem(_)));
    assert_eq!(h.player.state().await.unwrap(), PlayerState::Idle);
    assert!(h.audio.calls().is_empty());
}

#[tokio::test]
async fn test_load_failure_keeps_previous_item() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();
    h.audio.set_position(10.0);
    h.audio.fail_next_load();

    let err = h
        .player
        .load_item(episode("b"), LoadOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PlaybackError::Load { .. }));
    let now_playing = h.player.now_playing().await.unwrap().unwrap();
    assert!(now_playing.is_same_identity(&episode("a")));
    assert_eq!(h.player.state().await.unwrap(), PlayerState::Playing);

    let index = h.player.get_history_index().await.unwrap();
    assert!(index.get(&episode_identity("b")).is_none());
}

#[tokio::test]
async fn test_paused_load_is_ready() {
    let h = Harness::start().await;

    h.player
        .load_item(episode("a"), LoadOptions::paused())
        .await
        .unwrap();

    assert_eq!(h.player.state().await.unwrap(), PlayerState::Ready);
}

#[tokio::test]
async fn test_official_chapter_of_current_episode_seeks() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a").with_duration(3600.0), LoadOptions::default())
        .await
        .unwrap();

    let chapter = clip("ch-2", "a", 300.0, Some(420.0)).as_official_chapter();
    h.player
        .load_item(chapter, LoadOptions::default())
        .await
        .unwrap();

    let now_playing = h.player.now_playing().await.unwrap().unwrap();
    assert!(now_playing.clip_id.is_none());
    assert!(h.audio.calls().contains(&"seek:300".to_string()));
    assert_eq!(
        h.audio.calls().iter().filter(|c| c.starts_with("load:")).count(),
        1
    );
}

// ============================================================================
// Position flushes
// ============================================================================

#[tokio::test]
async fn test_previous_item_is_flushed_before_next_load() {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
    let h = HarnessBuilder::new()
        .kv(kv.clone())
        .audio(FakePlayer::new().with_history_probe(kv))
        .start()
        .await;

    h.player
        .load_item(episode("a").with_duration(120.0), LoadOptions::default())
        .await
        .unwrap();
    h.audio.set_position(42.0);
    h.player
        .load_item(episode("b"), LoadOptions::default())
        .await
        .unwrap();

    let snapshots = h.audio.history_at_load();
    assert_eq!(snapshots.len(), 2);
    let a = snapshots[1]
        .iter()
        .find(|r| r.identity == episode_identity("a"))
        .expect("a recorded before b loads");
    assert_eq!(a.user_playback_position, 42.0);
    assert!(!a.completed);
}

#[tokio::test]
async fn test_pause_and_background_flush_position() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a").with_duration(600.0), LoadOptions::default())
        .await
        .unwrap();

    h.audio.set_position(33.7);
    h.player.pause().await.unwrap();
    let index = h.player.get_history_index().await.unwrap();
    assert_eq!(index.get(&episode_identity("a")).unwrap().user_playback_position, 33.0);

    h.audio.set_position(90.0);
    h.player.app_backgrounded().await.unwrap();
    let index = h.player.get_history_index().await.unwrap();
    assert_eq!(index.get(&episode_identity("a")).unwrap().user_playback_position, 90.0);
}

#[tokio::test]
async fn test_flush_keeps_history_order() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();
    h.player
        .load_item(episode("b"), LoadOptions::default())
        .await
        .unwrap();

    // b is newest; flushing a again on the next switch must not reorder
    h.player
        .load_item(episode("a"), LoadOptions::paused())
        .await
        .unwrap();
    h.audio.set_position(12.0);
    h.player.pause().await.unwrap();

    let order: Vec<_> = h.stored_history().await.into_iter().map(|r| r.identity).collect();
    assert_eq!(order, vec![episode_identity("b"), episode_identity("a")]);
}

#[tokio::test]
async fn test_seek_clamps_at_zero() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();

    h.player.seek_to(-15.0).await.unwrap();

    assert!(h.audio.calls().contains(&"seek:0".to_string()));
}

#[tokio::test]
async fn test_jumps_use_settings_and_stay_in_bounds() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a").with_duration(100.0), LoadOptions::default())
        .await
        .unwrap();

    h.audio.set_position(50.0);
    h.player.jump_forward(None).await.unwrap();
    assert!(h.audio.calls().contains(&"seek:80".to_string()));

    h.player.jump_forward(None).await.unwrap();
    assert!(h.audio.calls().contains(&"seek:100".to_string()));

    h.audio.set_position(4.0);
    h.player.jump_backward(None).await.unwrap();
    assert!(h.audio.calls().contains(&"seek:0".to_string()));
}

#[tokio::test]
async fn test_jumps_take_explicit_seconds() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a").with_duration(100.0), LoadOptions::default())
        .await
        .unwrap();

    h.audio.set_position(50.0);
    h.player.jump_forward(Some(5)).await.unwrap();
    assert!(h.audio.calls().contains(&"seek:55".to_string()));

    h.player.jump_backward(Some(20)).await.unwrap();
    assert!(h.audio.calls().contains(&"seek:35".to_string()));
}

// ============================================================================
// Backend selection
// ============================================================================

#[tokio::test]
async fn test_video_item_uses_video_backend_with_capped_rate() {
    let h = Harness::start().await;
    SettingsStore::new(h.kv.clone())
        .set_playback_speed(3.0)
        .await
        .unwrap();

    h.player
        .load_item(video_episode("v"), LoadOptions::default())
        .await
        .unwrap();
    assert!(h.video.loaded().is_some());
    assert_eq!(h.video.current_rate(), 2.0);

    let applied = h.player.set_playback_speed(2.5).await.unwrap();
    assert_eq!(applied, 2.0);

    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();
    assert!(h.video.calls().contains(&"pause".to_string()));
    assert_eq!(h.audio.current_rate(), 2.5);
}

#[tokio::test]
async fn test_events_from_inactive_backend_are_ignored() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();

    h.video_events
        .emit(EngineEvent::StateChanged(PlayerState::Paused));
    h.video_events.emit(EngineEvent::QueueEnded);
    h.settle().await;

    assert_eq!(h.player.state().await.unwrap(), PlayerState::Playing);
    assert!(h.player.now_playing().await.unwrap().is_some());
}

#[tokio::test]
async fn test_invalid_playback_speed_is_rejected() {
    let h = Harness::start().await;

    let err = h.player.set_playback_speed(0.0).await.unwrap_err();

    assert!(matches!(err, PlaybackError::Core(_)));
}

// ============================================================================
// Clip boundaries
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_clip_end_hands_off_to_episode_exactly_once() {
    let h = Harness::start().await;
    let mut rx = h.events.subscribe();

    h.player
        .load_item(clip("c1", "ep-1", 30.0, Some(60.0)), LoadOptions::default())
        .await
        .unwrap();
    assert_eq!(h.audio.loaded().unwrap().user_playback_position, 30.0);

    h.audio.set_position(45.0);
    tokio::time::sleep(Duration::from_millis(600)).await;
    h.settle().await;
    assert!(h.player.now_playing().await.unwrap().unwrap().clip_id.is_some());

    h.audio.set_position(60.4);
    tokio::time::sleep(Duration::from_millis(600)).await;
    h.settle().await;

    let now_playing = h.player.now_playing().await.unwrap().unwrap();
    assert!(now_playing.clip_id.is_none());
    assert_eq!(now_playing.episode_id.as_ref().unwrap().as_str(), "ep-1");
    assert_eq!(h.player.state().await.unwrap(), PlayerState::Playing);

    let index = h.player.get_history_index().await.unwrap();
    let episode = index.get(&episode_identity("ep-1")).unwrap();
    assert_eq!(episode.user_playback_position, 60.0);
    assert!(index.get(&clip_identity("c1")).is_some());

    tokio::time::sleep(Duration::from_secs(3)).await;
    h.settle().await;
    assert_eq!(clip_ended_count(&drain(&mut rx)), 1);

    let calls = h.audio.calls();
    let pause = calls.iter().position(|c| c == "pause").unwrap();
    let play = calls.iter().rposition(|c| c == "play").unwrap();
    assert!(pause < play);
}

#[tokio::test(start_paused = true)]
async fn test_seek_past_clip_end_triggers_handoff() {
    let h = Harness::start().await;
    let mut rx = h.events.subscribe();
    h.player
        .load_item(clip("c1", "ep-1", 30.0, Some(60.0)), LoadOptions::default())
        .await
        .unwrap();

    h.player.seek_to(75.0).await.unwrap();
    h.settle().await;

    let now_playing = h.player.now_playing().await.unwrap().unwrap();
    assert!(now_playing.clip_id.is_none());
    let index = h.player.get_history_index().await.unwrap();
    assert_eq!(
        index.get(&episode_identity("ep-1")).unwrap().user_playback_position,
        75.0
    );
    assert_eq!(clip_ended_count(&drain(&mut rx)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_from_replaced_clip_are_ignored() {
    let h = Harness::start().await;
    let mut rx = h.events.subscribe();
    h.player
        .load_item(clip("c1", "ep-1", 30.0, Some(60.0)), LoadOptions::default())
        .await
        .unwrap();
    h.player
        .load_item(episode("b"), LoadOptions::default())
        .await
        .unwrap();

    h.audio.set_position(70.0);
    tokio::time::sleep(Duration::from_secs(2)).await;
    h.settle().await;

    assert_eq!(clip_ended_count(&drain(&mut rx)), 0);
    let now_playing = h.player.now_playing().await.unwrap().unwrap();
    assert!(now_playing.is_same_identity(&episode("b")));
}

#[tokio::test(start_paused = true)]
async fn test_open_ended_clip_plays_on() {
    let h = Harness::start().await;
    let mut rx = h.events.subscribe();
    h.player
        .load_item(clip("c1", "ep-1", 30.0, None), LoadOptions::default())
        .await
        .unwrap();

    h.audio.set_position(5000.0);
    tokio::time::sleep(Duration::from_secs(2)).await;
    h.settle().await;

    assert_eq!(clip_ended_count(&drain(&mut rx)), 0);
    assert!(h.player.now_playing().await.unwrap().unwrap().clip_id.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_restart_clip_replays_and_ends_again() {
    let h = Harness::start().await;
    let mut rx = h.events.subscribe();
    h.player
        .load_item(clip("c1", "ep-1", 30.0, Some(60.0)), LoadOptions::default())
        .await
        .unwrap();

    h.audio.set_position(60.4);
    tokio::time::sleep(Duration::from_millis(600)).await;
    h.settle().await;
    assert!(h.player.now_playing().await.unwrap().unwrap().clip_id.is_none());

    h.player.restart_clip().await.unwrap();

    let now_playing = h.player.now_playing().await.unwrap().unwrap();
    assert_eq!(now_playing.clip_id.as_ref().unwrap().as_str(), "c1");
    assert!(h.audio.calls().contains(&"seek:30".to_string()));
    assert_eq!(h.player.state().await.unwrap(), PlayerState::Playing);

    h.audio.set_position(61.0);
    tokio::time::sleep(Duration::from_millis(600)).await;
    h.settle().await;

    assert_eq!(clip_ended_count(&drain(&mut rx)), 2);
    assert!(h.player.now_playing().await.unwrap().unwrap().clip_id.is_none());
}

#[tokio::test]
async fn test_restart_clip_without_clip_fails() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();

    assert!(matches!(
        h.player.restart_clip().await,
        Err(PlaybackError::InvalidItem(_))
    ));
}

// ============================================================================
// End of item
// ============================================================================

#[tokio::test]
async fn test_end_of_item_completes_and_advances_queue() {
    let h = Harness::start().await;
    let mut rx = h.events.subscribe();
    h.player.enqueue_last(episode("b")).await.unwrap();
    h.player
        .load_item(episode("a").with_duration(120.0), LoadOptions::default())
        .await
        .unwrap();
    assert!(h.audio.queued_next().unwrap().is_same_identity(&episode("b")));

    h.audio.set_position(119.0);
    h.audio_events.emit(EngineEvent::QueueEnded);
    h.settle().await;

    let now_playing = h.player.now_playing().await.unwrap().unwrap();
    assert!(now_playing.is_same_identity(&episode("b")));
    assert!(h.player.queue_items().await.unwrap().is_empty());

    let index = h.player.get_history_index().await.unwrap();
    let a = index.get(&episode_identity("a")).unwrap();
    assert!(a.completed);
    assert_eq!(a.user_playback_position, 0.0);

    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, PlayerEvent::EpisodeCompleted { episode_id } if episode_id.as_str() == "a")));
}

#[tokio::test]
async fn test_end_of_last_item_is_terminal() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a").with_duration(120.0), LoadOptions::default())
        .await
        .unwrap();

    h.audio_events
        .emit(EngineEvent::StateChanged(PlayerState::Ended));
    h.settle().await;

    assert_eq!(h.player.state().await.unwrap(), PlayerState::Ended);
    assert!(h.player.now_playing().await.unwrap().is_none());
    let index = h.player.get_history_index().await.unwrap();
    assert!(index.get(&episode_identity("a")).unwrap().completed);
}

struct NextInFeed;

#[async_trait]
impl NextEpisodeLookup for NextInFeed {
    async fn next_episode(
        &self,
        _current: &NowPlayingItem,
    ) -> podline_core::Result<Option<NowPlayingItem>> {
        Ok(Some(episode("following")))
    }
}

#[tokio::test]
async fn test_end_of_item_continues_with_next_episode_when_enabled() {
    let h = HarnessBuilder::new()
        .next_episode(Arc::new(NextInFeed))
        .start()
        .await;
    SettingsStore::new(h.kv.clone())
        .set_auto_play_episodes_from_podcast(true)
        .await
        .unwrap();
    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();

    h.audio_events.emit(EngineEvent::QueueEnded);
    h.settle().await;

    let now_playing = h.player.now_playing().await.unwrap().unwrap();
    assert!(now_playing.is_same_identity(&episode("following")));
}

#[tokio::test]
async fn test_native_track_change_adopts_next_item() {
    let h = Harness::start().await;
    h.player.enqueue_last(episode("b")).await.unwrap();
    h.player
        .load_item(episode("a").with_duration(120.0), LoadOptions::default())
        .await
        .unwrap();

    h.audio_events.emit(EngineEvent::TrackChanged {
        next: Some(episode("b")),
        last_position: 50.0,
    });
    h.settle().await;

    let now_playing = h.player.now_playing().await.unwrap().unwrap();
    assert!(now_playing.is_same_identity(&episode("b")));
    assert!(h.player.queue_items().await.unwrap().is_empty());

    let index = h.player.get_history_index().await.unwrap();
    let a = index.get(&episode_identity("a")).unwrap();
    assert_eq!(a.user_playback_position, 50.0);
    assert!(!a.completed);
    assert!(index.get(&episode_identity("b")).is_some());
}

// ============================================================================
// Remote control and audio focus
// ============================================================================

#[tokio::test]
async fn test_transient_duck_pauses_and_resumes() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();

    h.audio_events.emit(EngineEvent::Remote(RemoteCommand::Duck {
        paused: true,
        permanent: false,
    }));
    h.settle().await;
    assert_eq!(h.player.state().await.unwrap(), PlayerState::Paused);

    h.audio_events.emit(EngineEvent::Remote(RemoteCommand::Duck {
        paused: false,
        permanent: false,
    }));
    h.settle().await;
    assert_eq!(h.player.state().await.unwrap(), PlayerState::Playing);
}

#[tokio::test]
async fn test_permanent_duck_does_not_resume() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();

    h.audio_events.emit(EngineEvent::Remote(RemoteCommand::Duck {
        paused: true,
        permanent: true,
    }));
    h.audio_events.emit(EngineEvent::Remote(RemoteCommand::Duck {
        paused: false,
        permanent: false,
    }));
    h.settle().await;

    assert_eq!(h.player.state().await.unwrap(), PlayerState::Paused);
}

#[tokio::test]
async fn test_duck_does_not_resume_user_pause() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();
    h.player.pause().await.unwrap();

    h.audio_events.emit(EngineEvent::Remote(RemoteCommand::Duck {
        paused: true,
        permanent: false,
    }));
    h.audio_events.emit(EngineEvent::Remote(RemoteCommand::Duck {
        paused: false,
        permanent: false,
    }));
    h.settle().await;

    assert_eq!(h.player.state().await.unwrap(), PlayerState::Paused);
}

#[tokio::test]
async fn test_remote_stop_pauses_and_notifies() {
    let h = Harness::start().await;
    let mut rx = h.events.subscribe();
    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();

    h.audio_events.emit(EngineEvent::Remote(RemoteCommand::Stop));
    h.settle().await;

    assert_eq!(h.player.state().await.unwrap(), PlayerState::Paused);
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, PlayerEvent::RemoteStop)));
}

#[tokio::test]
async fn test_toggle_play() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();

    h.player.toggle_play().await.unwrap();
    assert_eq!(h.player.state().await.unwrap(), PlayerState::Paused);
    h.player.toggle_play().await.unwrap();
    assert_eq!(h.player.state().await.unwrap(), PlayerState::Playing);
}

#[tokio::test]
async fn test_play_without_item_fails() {
    let h = Harness::start().await;

    assert!(matches!(
        h.player.play().await,
        Err(PlaybackError::NoItemLoaded)
    ));
}

// ============================================================================
// Chapters
// ============================================================================

#[tokio::test]
async fn test_next_and_previous_follow_chapters() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a").with_duration(1000.0), LoadOptions::default())
        .await
        .unwrap();
    h.player
        .set_chapters(vec![
            Chapter::new(600.0, "Outro"),
            Chapter::new(0.0, "Intro"),
            Chapter::new(300.0, "Interview"),
        ])
        .await
        .unwrap();

    h.audio.set_position(100.0);
    assert!(!h.player.next().await.unwrap());
    assert!(h.audio.calls().contains(&"seek:300".to_string()));

    h.audio.set_position(650.0);
    assert!(!h.player.next().await.unwrap());
    assert!(h.audio.calls().contains(&"seek:970".to_string()));

    h.audio.set_position(650.0);
    h.player.previous().await.unwrap();
    let seeks: Vec<_> = h.audio.calls().into_iter().filter(|c| c.starts_with("seek:")).collect();
    assert_eq!(seeks.last().unwrap(), "seek:300");
}

#[tokio::test]
async fn test_next_without_chapters_plays_queue() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();
    h.player.enqueue_last(episode("b")).await.unwrap();

    assert!(h.player.next().await.unwrap());

    let now_playing = h.player.now_playing().await.unwrap().unwrap();
    assert!(now_playing.is_same_identity(&episode("b")));
    assert!(!h.player.next().await.unwrap());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_restore_after_restart() {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
    let h = HarnessBuilder::new().kv(kv.clone()).start().await;
    h.player
        .load_item(episode("a").with_duration(600.0), LoadOptions::default())
        .await
        .unwrap();
    h.audio.set_position(42.0);
    h.player.shutdown().unwrap();
    h.task.await.unwrap();

    let h = HarnessBuilder::new().kv(kv).start().await;
    assert!(h.player.restore().await.unwrap());

    let now_playing = h.player.now_playing().await.unwrap().unwrap();
    assert!(now_playing.is_same_identity(&episode("a")));
    assert_eq!(now_playing.user_playback_position, 42.0);
    assert_eq!(h.player.state().await.unwrap(), PlayerState::Ready);
}

#[tokio::test]
async fn test_restore_with_nothing_stored() {
    let h = Harness::start().await;

    assert!(!h.player.restore().await.unwrap());
}

#[tokio::test]
async fn test_clear_now_playing_goes_idle() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();

    h.player.clear_now_playing().await.unwrap();

    assert_eq!(h.player.state().await.unwrap(), PlayerState::Idle);
    assert!(h.player.now_playing().await.unwrap().is_none());
    assert!(h.audio.calls().contains(&"stop".to_string()));
}

#[tokio::test]
async fn test_handle_reports_closed_dispatcher() {
    let h = Harness::start().await;
    h.player.shutdown().unwrap();
    h.task.await.unwrap();

    assert!(matches!(
        h.player.play().await,
        Err(PlaybackError::DispatcherClosed)
    ));
}

#[tokio::test]
async fn test_dropping_every_handle_stops_dispatcher_with_flush() {
    let h = Harness::start().await;
    h.player
        .load_item(episode("a"), LoadOptions::default())
        .await
        .unwrap();
    h.audio.set_position(42.0);

    let Harness {
        player,
        task,
        audio_events,
        kv,
        ..
    } = h;
    drop(player);

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("dispatcher should stop once handles are gone")
        .unwrap();

    let stored = podline_storage::HistoryStore::new(kv).load().await.unwrap();
    assert_eq!(stored[0].user_playback_position, 42.0);
    audio_events.emit(EngineEvent::QueueEnded);
}
