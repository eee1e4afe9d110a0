//! Storage keys
//!
//! Every persisted document lives under one of these keys.

// Playback state
/// History records, most recent first
pub const HISTORY_ITEMS: &str = "history.items";

/// The item loaded in the player
pub const NOW_PLAYING_ITEM: &str = "player.now_playing_item";

/// Set once a clip's end boundary fired; cleared when the next clip loads
pub const CLIP_HAS_ENDED: &str = "player.clip_has_ended";

/// Queued items in play order
pub const QUEUE_ITEMS: &str = "queue.items";

// Downloads
/// Per-episode download records
pub const DOWNLOADED_EPISODES: &str = "downloads.episodes";

/// Map of podcast key to auto-download flag
pub const AUTO_DOWNLOAD_SETTINGS: &str = "downloads.auto_download_settings";

/// Map of podcast key to downloaded-episode limit
pub const DOWNLOADED_EPISODE_LIMITS: &str = "downloads.episode_limits";

/// Limit applied to podcasts without their own limit (0 = unlimited)
pub const DOWNLOADED_EPISODE_LIMIT_DEFAULT: &str = "downloads.episode_limit_default";

/// Publish-date cursor for auto-download passes
pub const AUTO_DOWNLOADS_LAST_REFRESHED: &str = "downloads.last_refreshed";

// User preferences
/// Only download media over wifi
pub const DOWNLOADING_WIFI_ONLY: &str = "settings.downloading_wifi_only";

/// Treat the device as offline regardless of connectivity
pub const OFFLINE_MODE_ENABLED: &str = "settings.offline_mode";

/// Seconds to jump back
pub const JUMP_BACKWARDS_SECONDS: &str = "settings.jump_backwards_seconds";

/// Seconds to jump forward
pub const JUMP_FORWARDS_SECONDS: &str = "settings.jump_forwards_seconds";

/// Playback rate multiplier
pub const PLAYBACK_SPEED: &str = "settings.playback_speed";

/// Delete a downloaded episode once it finishes playing
pub const AUTO_DELETE_EPISODE_ON_END: &str = "settings.auto_delete_episode_on_end";

/// Map of podcast key to auto-queue flag
pub const AUTO_QUEUE_SETTINGS: &str = "settings.auto_queue_settings";

/// Where auto-queued episodes go (`first` / `last`)
pub const AUTO_QUEUE_POSITION: &str = "settings.auto_queue_position";

/// Continue with the next episode of the same podcast when the queue empties
pub const AUTO_PLAY_EPISODES_FROM_PODCAST: &str = "settings.auto_play_episodes_from_podcast";

/// Put the interrupted item back at the head of the queue when loading another
pub const ADD_CURRENT_ITEM_NEXT_IN_QUEUE: &str = "settings.add_current_item_next_in_queue";
