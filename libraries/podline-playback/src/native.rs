//! Native player boundary
//!
//! Abstracts the OS audio and video players. Implementors decode and render
//! media; the player core only drives transport and listens for events.

use crate::dispatcher::PlayerMessage;
use crate::engine::EngineKind;
use crate::types::PlayerState;
use async_trait::async_trait;
use podline_core::types::NowPlayingItem;
use podline_core::Result;
use tokio::sync::mpsc;
use tracing::warn;

/// Platform-specific media player
///
/// Positions and durations are in seconds. Errors are reported as
/// `PodError::Engine`.
#[async_trait]
pub trait NativePlayer: Send + Sync {
    /// Open `item`, seek to `start_position` and optionally start playing
    async fn load(&self, item: &NowPlayingItem, start_position: f64, should_play: bool)
        -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    /// Stop and release the current media
    async fn stop(&self) -> Result<()>;

    async fn seek_to(&self, position: f64) -> Result<()>;

    async fn position(&self) -> f64;

    /// Media duration once known
    async fn duration(&self) -> Option<f64>;

    async fn rate(&self) -> f64;

    async fn set_rate(&self, rate: f64) -> Result<()>;

    async fn state(&self) -> PlayerState;

    /// Hand the item after the current one to the native queue
    ///
    /// Players without a native queue keep the default no-op.
    async fn enqueue_next(&self, _item: &NowPlayingItem) -> Result<()> {
        Ok(())
    }
}

/// Remote-control and audio-focus commands
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCommand {
    Play,
    Pause,
    Stop,
    Seek(f64),
    JumpBackward,
    JumpForward,
    Next,
    Previous,

    /// Audio focus change; `paused: false` is the matching un-duck
    Duck { paused: bool, permanent: bool },
}

/// Events a native player reports back
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The native queue moved on to the item handed over with `enqueue_next`
    TrackChanged {
        next: Option<NowPlayingItem>,
        /// Where the previous item stopped
        last_position: f64,
    },

    /// The native queue ran out
    QueueEnded,

    StateChanged(PlayerState),

    Remote(RemoteCommand),

    PlaybackError(String),
}

/// Where a native player sends its events
///
/// Each sink is tagged with the backend it belongs to, so reports from an
/// inactive backend can be told apart and ignored.
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    kind: EngineKind,
    tx: mpsc::WeakUnboundedSender<PlayerMessage>,
}

impl EngineEventSink {
    pub(crate) fn new(kind: EngineKind, tx: mpsc::WeakUnboundedSender<PlayerMessage>) -> Self {
        Self { kind, tx }
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn emit(&self, event: EngineEvent) {
        let message = PlayerMessage::Engine {
            kind: self.kind,
            event,
        };
        let sent = self.tx.upgrade().is_some_and(|tx| tx.send(message).is_ok());
        if !sent {
            warn!(kind = ?self.kind, "Player dispatcher gone, dropping engine event");
        }
    }
}
