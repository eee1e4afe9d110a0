/// Queue value types
use super::now_playing::NowPlayingItem;
use serde::{Deserialize, Serialize};

/// An item waiting in the playback queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub item: NowPlayingItem,
    /// Zero-based ordinal in the queue
    pub position: usize,
}

/// Where auto-enqueued episodes are inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoQueuePosition {
    First,
    #[default]
    Last,
}
