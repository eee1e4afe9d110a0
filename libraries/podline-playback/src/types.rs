//! Core types for the player

use podline_core::types::NowPlayingItem;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Logical player state, shared by both backends
///
/// ```text
/// Idle -> Loading -> Ready -> Playing <-> Paused
///                    Ready/Playing -> Buffering -> Playing
/// Playing -> Ended (terminal, nothing queued)
/// any -> Idle (clear)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerState {
    /// Nothing loaded
    #[default]
    Idle,

    /// Backend is opening the media
    Loading,

    /// Loaded but not started
    Ready,

    /// Stalled on the network mid-playback
    Buffering,

    Playing,

    Paused,

    /// Finished the last item with nothing to advance to
    Ended,
}

impl PlayerState {
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing | Self::Buffering)
    }
}

/// Options for loading an item
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Start playback once loaded
    pub should_play: bool,

    /// Move the new item's history record to the front
    pub force_update_order_date: bool,

    /// Item to hand to the backend's native queue, when it has one
    pub item_to_queue_next: Option<NowPlayingItem>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            should_play: true,
            force_update_order_date: true,
            item_to_queue_next: None,
        }
    }
}

impl LoadOptions {
    /// Load without starting playback and without reordering history
    pub fn paused() -> Self {
        Self {
            should_play: false,
            force_update_order_date: false,
            item_to_queue_next: None,
        }
    }

    pub fn with_queue_next(mut self, item: NowPlayingItem) -> Self {
        self.item_to_queue_next = Some(item);
        self
    }
}

/// Player tuning
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    /// Period of the clip end check
    pub clip_check_interval: Duration,

    /// An item within this many seconds of its end counts as completed
    pub completion_threshold_secs: f64,

    /// "Next" with chapters but no next chapter seeks this far before the end
    pub skip_to_end_offset_secs: f64,

    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            clip_check_interval: crate::clip::CLIP_CHECK_INTERVAL,
            completion_threshold_secs: crate::history::COMPLETION_THRESHOLD_SECS,
            skip_to_end_offset_secs: 30.0,
            event_capacity: 64,
        }
    }
}
