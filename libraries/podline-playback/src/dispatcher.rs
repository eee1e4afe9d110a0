//! Single-owner dispatcher for the player
//!
//! All inputs are serialized through one unbounded channel: user commands
//! from [`PlayerHandle`], events from the native players, and clip ticks.
//! The dispatcher task owns the [`PlayerManager`] and handles one message at
//! a time, so a clip tick can never interleave with a load or a seek.
//!
//! ```text
//! PlayerHandle ──┐
//! EngineEventSink ├──> mpsc ──> dispatcher task ──> PlayerManager
//! clip ticker ───┘
//! ```

use crate::engine::EngineKind;
use crate::error::{PlaybackError, Result};
use crate::manager::PlayerManager;
use crate::native::{EngineEvent, EngineEventSink};
use crate::types::{LoadOptions, PlayerState};
use podline_core::types::{
    CatalogEpisode, Chapter, HistoryIndex, NowPlayingItem, PlaybackIdentity, QueueItem,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Reply<T> = oneshot::Sender<Result<T>>;

/// Everything the dispatcher task receives
#[derive(Debug)]
pub enum PlayerMessage {
    Command(PlayerCommand),
    Engine { kind: EngineKind, event: EngineEvent },
    /// Periodic clip check, stamped with the session it was armed for
    ClipTick { session: u64 },
    /// Follow-up after a clip end was handled
    ClipEnded { session: u64 },
    /// Flush and stop the dispatcher
    Shutdown,
}

/// User commands, each carrying its reply channel
#[derive(Debug)]
pub enum PlayerCommand {
    LoadItem {
        item: Box<NowPlayingItem>,
        options: LoadOptions,
        reply: Reply<()>,
    },
    Play { reply: Reply<()> },
    Pause { reply: Reply<()> },
    TogglePlay { reply: Reply<()> },
    SeekTo { position: f64, reply: Reply<()> },
    JumpBackward {
        seconds: Option<u32>,
        reply: Reply<()>,
    },
    JumpForward {
        seconds: Option<u32>,
        reply: Reply<()>,
    },
    RestartClip { reply: Reply<()> },
    Next { reply: Reply<bool> },
    Previous { reply: Reply<()> },
    RecordPositionNow { reply: Reply<()> },
    SetPlaybackSpeed { rate: f64, reply: Reply<f64> },
    ClearNowPlaying { reply: Reply<()> },
    Restore { reply: Reply<bool> },
    AppBackgrounded { reply: Reply<()> },
    AppForegrounded { reply: Reply<()> },
    GetHistoryIndex { reply: Reply<HistoryIndex> },
    EnqueueNext {
        item: Box<NowPlayingItem>,
        reply: Reply<()>,
    },
    EnqueueLast {
        item: Box<NowPlayingItem>,
        reply: Reply<()>,
    },
    RemoveFromQueue {
        identity: PlaybackIdentity,
        reply: Reply<bool>,
    },
    ReorderQueue {
        from: usize,
        to: usize,
        reply: Reply<()>,
    },
    HandleNewEpisodes {
        episodes: Vec<CatalogEpisode>,
        reply: Reply<usize>,
    },
    SetChapters {
        chapters: Vec<Chapter>,
        reply: oneshot::Sender<()>,
    },
    QueueItems { reply: oneshot::Sender<Vec<QueueItem>> },
    NowPlaying {
        reply: oneshot::Sender<Option<NowPlayingItem>>,
    },
    State { reply: oneshot::Sender<PlayerState> },
}

/// The channel the dispatcher reads from
///
/// Create it before the manager so the clip controller and the native
/// players' sinks can be wired to it.
pub struct PlayerChannel {
    tx: mpsc::UnboundedSender<PlayerMessage>,
    rx: mpsc::UnboundedReceiver<PlayerMessage>,
}

impl PlayerChannel {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Event sink for the native player behind `kind`
    pub fn engine_sink(&self, kind: EngineKind) -> EngineEventSink {
        EngineEventSink::new(kind, self.tx.downgrade())
    }

    pub(crate) fn weak_sender(&self) -> mpsc::WeakUnboundedSender<PlayerMessage> {
        self.tx.downgrade()
    }
}

impl Default for PlayerChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable front door to a running player
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerMessage>,
}

impl PlayerHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> PlayerCommand) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PlayerMessage::Command(build(reply)))
            .map_err(|_| PlaybackError::DispatcherClosed)?;
        rx.await.map_err(|_| PlaybackError::DispatcherClosed)
    }

    pub async fn load_item(&self, item: NowPlayingItem, options: LoadOptions) -> Result<()> {
        self.request(|reply| PlayerCommand::LoadItem {
            item: Box::new(item),
            options,
            reply,
        })
        .await?
    }

    pub async fn play(&self) -> Result<()> {
        self.request(|reply| PlayerCommand::Play { reply }).await?
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(|reply| PlayerCommand::Pause { reply }).await?
    }

    pub async fn toggle_play(&self) -> Result<()> {
        self.request(|reply| PlayerCommand::TogglePlay { reply })
            .await?
    }

    pub async fn seek_to(&self, position: f64) -> Result<()> {
        self.request(|reply| PlayerCommand::SeekTo { position, reply })
            .await?
    }

    /// Jump back `seconds`; `None` uses the jump-backwards setting
    pub async fn jump_backward(&self, seconds: Option<u32>) -> Result<()> {
        self.request(|reply| PlayerCommand::JumpBackward { seconds, reply })
            .await?
    }

    /// Jump ahead `seconds`; `None` uses the jump-forwards setting
    pub async fn jump_forward(&self, seconds: Option<u32>) -> Result<()> {
        self.request(|reply| PlayerCommand::JumpForward { seconds, reply })
            .await?
    }

    pub async fn restart_clip(&self) -> Result<()> {
        self.request(|reply| PlayerCommand::RestartClip { reply })
            .await?
    }

    pub async fn next(&self) -> Result<bool> {
        self.request(|reply| PlayerCommand::Next { reply }).await?
    }

    pub async fn previous(&self) -> Result<()> {
        self.request(|reply| PlayerCommand::Previous { reply })
            .await?
    }

    pub async fn record_position_now(&self) -> Result<()> {
        self.request(|reply| PlayerCommand::RecordPositionNow { reply })
            .await?
    }

    pub async fn set_playback_speed(&self, rate: f64) -> Result<f64> {
        self.request(|reply| PlayerCommand::SetPlaybackSpeed { rate, reply })
            .await?
    }

    pub async fn clear_now_playing(&self) -> Result<()> {
        self.request(|reply| PlayerCommand::ClearNowPlaying { reply })
            .await?
    }

    pub async fn restore(&self) -> Result<bool> {
        self.request(|reply| PlayerCommand::Restore { reply })
            .await?
    }

    pub async fn app_backgrounded(&self) -> Result<()> {
        self.request(|reply| PlayerCommand::AppBackgrounded { reply })
            .await?
    }

    pub async fn app_foregrounded(&self) -> Result<()> {
        self.request(|reply| PlayerCommand::AppForegrounded { reply })
            .await?
    }

    pub async fn get_history_index(&self) -> Result<HistoryIndex> {
        self.request(|reply| PlayerCommand::GetHistoryIndex { reply })
            .await?
    }

    pub async fn enqueue_next(&self, item: NowPlayingItem) -> Result<()> {
        self.request(|reply| PlayerCommand::EnqueueNext {
            item: Box::new(item),
            reply,
        })
        .await?
    }

    pub async fn enqueue_last(&self, item: NowPlayingItem) -> Result<()> {
        self.request(|reply| PlayerCommand::EnqueueLast {
            item: Box::new(item),
            reply,
        })
        .await?
    }

    pub async fn remove_from_queue(&self, identity: PlaybackIdentity) -> Result<bool> {
        self.request(|reply| PlayerCommand::RemoveFromQueue { identity, reply })
            .await?
    }

    pub async fn reorder_queue(&self, from: usize, to: usize) -> Result<()> {
        self.request(|reply| PlayerCommand::ReorderQueue { from, to, reply })
            .await?
    }

    pub async fn handle_new_episodes(&self, episodes: Vec<CatalogEpisode>) -> Result<usize> {
        self.request(|reply| PlayerCommand::HandleNewEpisodes { episodes, reply })
            .await?
    }

    pub async fn set_chapters(&self, chapters: Vec<Chapter>) -> Result<()> {
        self.request(|reply| PlayerCommand::SetChapters { chapters, reply })
            .await
    }

    pub async fn queue_items(&self) -> Result<Vec<QueueItem>> {
        self.request(|reply| PlayerCommand::QueueItems { reply })
            .await
    }

    pub async fn now_playing(&self) -> Result<Option<NowPlayingItem>> {
        self.request(|reply| PlayerCommand::NowPlaying { reply })
            .await
    }

    pub async fn state(&self) -> Result<PlayerState> {
        self.request(|reply| PlayerCommand::State { reply }).await
    }

    /// Ask the dispatcher to flush and stop
    pub fn shutdown(&self) -> Result<()> {
        self.tx
            .send(PlayerMessage::Shutdown)
            .map_err(|_| PlaybackError::DispatcherClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Start the dispatcher task
///
/// The dispatcher stops on [`PlayerHandle::shutdown`] or once every
/// [`PlayerHandle`] is dropped; either way the position is flushed first.
/// Engine sinks and the clip ticker do not keep it running. The join handle
/// yields the manager back once the dispatcher stops.
pub fn spawn_player(
    manager: PlayerManager,
    channel: PlayerChannel,
) -> (PlayerHandle, JoinHandle<PlayerManager>) {
    let PlayerChannel { tx, rx } = channel;
    let task = tokio::spawn(run(manager, rx));
    (PlayerHandle { tx }, task)
}

async fn run(
    mut manager: PlayerManager,
    mut rx: mpsc::UnboundedReceiver<PlayerMessage>,
) -> PlayerManager {
    info!("Player dispatcher started");

    while let Some(message) = rx.recv().await {
        match message {
            PlayerMessage::Command(command) => execute(&mut manager, command).await,
            PlayerMessage::Engine { kind, event } => {
                log_failure("engine event", manager.handle_engine_event(kind, event).await);
            }
            PlayerMessage::ClipTick { session } => {
                log_failure("clip tick", manager.handle_clip_tick(session).await);
            }
            PlayerMessage::ClipEnded { session } => {
                log_failure(
                    "clip handoff",
                    manager.resume_after_clip_ended(session).await,
                );
            }
            PlayerMessage::Shutdown => break,
        }
    }

    log_failure("shutdown flush", manager.app_backgrounded().await);

    info!("Player dispatcher stopped");
    manager
}

async fn execute(manager: &mut PlayerManager, command: PlayerCommand) {
    // A dropped receiver means the caller stopped waiting; the work is done
    // regardless.
    match command {
        PlayerCommand::LoadItem {
            item,
            options,
            reply,
        } => {
            let _ = reply.send(manager.load_item(*item, options).await);
        }
        PlayerCommand::Play { reply } => {
            let _ = reply.send(manager.play().await);
        }
        PlayerCommand::Pause { reply } => {
            let _ = reply.send(manager.pause().await);
        }
        PlayerCommand::TogglePlay { reply } => {
            let _ = reply.send(manager.toggle_play().await);
        }
        PlayerCommand::SeekTo { position, reply } => {
            let _ = reply.send(manager.seek_to(position).await);
        }
        PlayerCommand::JumpBackward { seconds, reply } => {
            let _ = reply.send(manager.jump_backward(seconds).await);
        }
        PlayerCommand::JumpForward { seconds, reply } => {
            let _ = reply.send(manager.jump_forward(seconds).await);
        }
        PlayerCommand::RestartClip { reply } => {
            let _ = reply.send(manager.restart_clip().await);
        }
        PlayerCommand::Next { reply } => {
            let _ = reply.send(manager.next().await);
        }
        PlayerCommand::Previous { reply } => {
            let _ = reply.send(manager.previous().await);
        }
        PlayerCommand::RecordPositionNow { reply } => {
            let _ = reply.send(manager.record_position_now().await);
        }
        PlayerCommand::SetPlaybackSpeed { rate, reply } => {
            let _ = reply.send(manager.set_playback_speed(rate).await);
        }
        PlayerCommand::ClearNowPlaying { reply } => {
            let _ = reply.send(manager.clear_now_playing().await);
        }
        PlayerCommand::Restore { reply } => {
            let _ = reply.send(manager.restore().await);
        }
        PlayerCommand::AppBackgrounded { reply } => {
            let _ = reply.send(manager.app_backgrounded().await);
        }
        PlayerCommand::AppForegrounded { reply } => {
            let _ = reply.send(manager.app_foregrounded().await);
        }
        PlayerCommand::GetHistoryIndex { reply } => {
            let _ = reply.send(manager.get_history_index().await);
        }
        PlayerCommand::EnqueueNext { item, reply } => {
            let _ = reply.send(manager.enqueue_next(*item).await);
        }
        PlayerCommand::EnqueueLast { item, reply } => {
            let _ = reply.send(manager.enqueue_last(*item).await);
        }
        PlayerCommand::RemoveFromQueue { identity, reply } => {
            let _ = reply.send(manager.remove_from_queue(&identity).await);
        }
        PlayerCommand::ReorderQueue { from, to, reply } => {
            let _ = reply.send(manager.reorder_queue(from, to).await);
        }
        PlayerCommand::HandleNewEpisodes { episodes, reply } => {
            let _ = reply.send(manager.handle_new_episodes(&episodes).await);
        }
        PlayerCommand::SetChapters { chapters, reply } => {
            manager.set_chapters(chapters);
            let _ = reply.send(());
        }
        PlayerCommand::QueueItems { reply } => {
            let _ = reply.send(manager.queue_items());
        }
        PlayerCommand::NowPlaying { reply } => {
            let _ = reply.send(manager.now_playing());
        }
        PlayerCommand::State { reply } => {
            let _ = reply.send(manager.state());
        }
    }
}

fn log_failure(context: &str, result: Result<()>) {
    match result {
        Ok(()) => {}
        Err(PlaybackError::NoItemLoaded) => debug!(context, "Nothing loaded"),
        Err(e) => warn!(context, error = %e, "Player message failed"),
    }
}
