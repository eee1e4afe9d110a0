//! User preferences
//!
//! Preferences are stored as JSON values under the `settings.*` keys. Every
//! getter falls back to a default when the key is missing or unreadable.
//!
//! # Example
//!
//! ```rust,no_run
//! use podline_storage::{MemoryKeyValueStore, SettingsStore};
//! use std::sync::Arc;
//! # async fn example() -> podline_core::Result<()> {
//! let settings = SettingsStore::new(Arc::new(MemoryKeyValueStore::new()));
//!
//! settings.set_jump_forwards_seconds(45).await?;
//! assert_eq!(settings.jump_forwards_seconds().await?, 45);
//! # Ok(())
//! # }
//! ```

use crate::json::{read_json, write_json};
use crate::keys::{
    ADD_CURRENT_ITEM_NEXT_IN_QUEUE, AUTO_DELETE_EPISODE_ON_END, AUTO_PLAY_EPISODES_FROM_PODCAST,
    AUTO_QUEUE_POSITION, AUTO_QUEUE_SETTINGS, DOWNLOADING_WIFI_ONLY, JUMP_BACKWARDS_SECONDS,
    JUMP_FORWARDS_SECONDS, OFFLINE_MODE_ENABLED, PLAYBACK_SPEED,
};
use podline_core::types::AutoQueuePosition;
use podline_core::{error::Result, KeyValueStore};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Default jump back, in seconds
pub const DEFAULT_JUMP_BACKWARDS_SECONDS: u32 = 10;

/// Default jump forward, in seconds
pub const DEFAULT_JUMP_FORWARDS_SECONDS: u32 = 30;

pub const DEFAULT_PLAYBACK_SPEED: f64 = 1.0;

/// Parse a jump-time entry; anything but a positive integer yields `None`
pub fn parse_jump_seconds(input: &str) -> Option<u32> {
    input.trim().parse::<u32>().ok().filter(|s| *s > 0)
}

#[derive(Clone)]
pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    async fn flag(&self, key: &str) -> Result<bool> {
        Ok(read_json(self.kv.as_ref(), key).await?.unwrap_or(false))
    }

    async fn set_flag(&self, key: &str, value: bool) -> Result<()> {
        write_json(self.kv.as_ref(), key, &value).await
    }

    async fn seconds(&self, key: &str, default: u32) -> Result<u32> {
        let value: Option<u32> = read_json(self.kv.as_ref(), key).await?;
        Ok(value.filter(|s| *s > 0).unwrap_or(default))
    }

    // ========================================================================
    // Transport
    // ========================================================================

    pub async fn jump_backwards_seconds(&self) -> Result<u32> {
        self.seconds(JUMP_BACKWARDS_SECONDS, DEFAULT_JUMP_BACKWARDS_SECONDS)
            .await
    }

    /// Store the jump-back time; 0 resets to the default
    pub async fn set_jump_backwards_seconds(&self, seconds: u32) -> Result<()> {
        if seconds == 0 {
            return self.kv.remove(JUMP_BACKWARDS_SECONDS).await;
        }
        write_json(self.kv.as_ref(), JUMP_BACKWARDS_SECONDS, &seconds).await
    }

    pub async fn jump_forwards_seconds(&self) -> Result<u32> {
        self.seconds(JUMP_FORWARDS_SECONDS, DEFAULT_JUMP_FORWARDS_SECONDS)
            .await
    }

    /// Store the jump-forward time; 0 resets to the default
    pub async fn set_jump_forwards_seconds(&self, seconds: u32) -> Result<()> {
        if seconds == 0 {
            return self.kv.remove(JUMP_FORWARDS_SECONDS).await;
        }
        write_json(self.kv.as_ref(), JUMP_FORWARDS_SECONDS, &seconds).await
    }

    pub async fn playback_speed(&self) -> Result<f64> {
        let value: Option<f64> = read_json(self.kv.as_ref(), PLAYBACK_SPEED).await?;
        Ok(value
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(DEFAULT_PLAYBACK_SPEED))
    }

    pub async fn set_playback_speed(&self, speed: f64) -> Result<()> {
        write_json(self.kv.as_ref(), PLAYBACK_SPEED, &speed).await
    }

    // ========================================================================
    // Network and downloads
    // ========================================================================

    pub async fn downloading_wifi_only(&self) -> Result<bool> {
        self.flag(DOWNLOADING_WIFI_ONLY).await
    }

    pub async fn set_downloading_wifi_only(&self, value: bool) -> Result<()> {
        self.set_flag(DOWNLOADING_WIFI_ONLY, value).await
    }

    pub async fn offline_mode(&self) -> Result<bool> {
        self.flag(OFFLINE_MODE_ENABLED).await
    }

    pub async fn set_offline_mode(&self, value: bool) -> Result<()> {
        self.set_flag(OFFLINE_MODE_ENABLED, value).await
    }

    pub async fn auto_delete_episode_on_end(&self) -> Result<bool> {
        self.flag(AUTO_DELETE_EPISODE_ON_END).await
    }

    pub async fn set_auto_delete_episode_on_end(&self, value: bool) -> Result<()> {
        self.set_flag(AUTO_DELETE_EPISODE_ON_END, value).await
    }

    // ========================================================================
    // Queue behaviour
    // ========================================================================

    pub async fn auto_queue_settings(&self) -> Result<BTreeMap<String, bool>> {
        Ok(read_json(self.kv.as_ref(), AUTO_QUEUE_SETTINGS)
            .await?
            .unwrap_or_default())
    }

    pub async fn is_auto_queue_enabled(&self, podcast_key: &str) -> Result<bool> {
        Ok(self
            .auto_queue_settings()
            .await?
            .get(podcast_key)
            .copied()
            .unwrap_or(false))
    }

    pub async fn set_auto_queue(&self, podcast_key: &str, enabled: bool) -> Result<()> {
        let mut settings = self.auto_queue_settings().await?;
        settings.insert(podcast_key.to_string(), enabled);
        write_json(self.kv.as_ref(), AUTO_QUEUE_SETTINGS, &settings).await
    }

    pub async fn auto_queue_position(&self) -> Result<AutoQueuePosition> {
        Ok(read_json(self.kv.as_ref(), AUTO_QUEUE_POSITION)
            .await?
            .unwrap_or_default())
    }

    pub async fn set_auto_queue_position(&self, position: AutoQueuePosition) -> Result<()> {
        write_json(self.kv.as_ref(), AUTO_QUEUE_POSITION, &position).await
    }

    pub async fn auto_play_episodes_from_podcast(&self) -> Result<bool> {
        self.flag(AUTO_PLAY_EPISODES_FROM_PODCAST).await
    }

    pub async fn set_auto_play_episodes_from_podcast(&self, value: bool) -> Result<()> {
        self.set_flag(AUTO_PLAY_EPISODES_FROM_PODCAST, value).await
    }

    pub async fn add_current_item_next_in_queue(&self) -> Result<bool> {
        self.flag(ADD_CURRENT_ITEM_NEXT_IN_QUEUE).await
    }

    pub async fn set_add_current_item_next_in_queue(&self, value: bool) -> Result<()> {
        self.set_flag(ADD_CURRENT_ITEM_NEXT_IN_QUEUE, value).await
    }
}
