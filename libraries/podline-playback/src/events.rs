//! Player Events
//!
//! Observable signals for UI synchronization and for other services (the
//! download scheduler listens for completions). Events are emitted at key
//! points:
//! - State changes (loading, playing, paused, ended)
//! - Track changes, including the clip to episode handoff
//! - Queue and history mutations

use crate::types::PlayerState;
use podline_core::types::{ClipId, EpisodeId, PlaybackIdentity};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Events emitted by the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// A clip reached its end time; playback paused before the handoff
    ClipEnded {
        clip_id: ClipId,
        episode_id: Option<EpisodeId>,
    },

    /// The now-playing item changed
    TrackChanged {
        identity: PlaybackIdentity,
        previous: Option<PlaybackIdentity>,
    },

    PlaybackStateChanged {
        state: PlayerState,
    },

    /// Queue changed (items added, removed or reordered)
    QueueUpdated {
        /// New queue length
        length: usize,
    },

    /// History changed; `None` for bulk changes (clear, sync)
    HistoryUpdated {
        identity: Option<PlaybackIdentity>,
    },

    /// An episode played to its end
    EpisodeCompleted {
        episode_id: EpisodeId,
    },

    /// Error reported by a backend
    PlaybackError {
        message: String,
    },

    /// Stop requested from a remote control (lock screen, headset)
    RemoteStop,
}

/// Broadcast fan-out for [`PlayerEvent`]
///
/// Emitting with no subscribers is not an error. Slow subscribers lag and
/// miss events rather than blocking the player.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: PlayerEvent) {
        trace!(?event, "Emitting player event");
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
