//! Podline Playback - Player Core
//!
//! Platform-agnostic playback state for podcast episodes and clips.
//!
//! This crate provides:
//! - Backend selection (audio vs video player, chosen per item)
//! - Clip boundaries (pause at the clip end, then continue the episode)
//! - History reconciliation (local upserts, best-effort remote writes, merge)
//! - Persistent queue (dedup by identity, auto-queue of new episodes)
//! - Remote-control and audio-focus handling
//! - Chapter navigation
//!
//! # Architecture
//!
//! `podline-playback` never decodes media. The OS players sit behind
//! [`NativePlayer`] and report back through an [`EngineEventSink`].
//!
//! One dispatcher task owns the [`PlayerManager`]; user commands, engine
//! events and clip ticks all arrive on the same channel and are handled in
//! order. Only remote history writes run beside it.
//!
//! # Example
//!
//! ```rust,no_run
//! use podline_core::network::StaticConnectivity;
//! use podline_core::types::{Connectivity, EpisodeId, MediaType, NowPlayingItem, PodcastSource};
//! use podline_playback::{
//!     spawn_player, EngineKind, LoadOptions, NativePlayer, PlayerChannel, PlayerDeps,
//!     PlayerManager,
//! };
//! use podline_storage::MemoryKeyValueStore;
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     audio: Arc<dyn NativePlayer>,
//! #     video: Arc<dyn NativePlayer>,
//! # ) -> podline_playback::Result<()> {
//! let channel = PlayerChannel::new();
//! let _audio_events = channel.engine_sink(EngineKind::Audio);
//! let _video_events = channel.engine_sink(EngineKind::Video);
//!
//! let deps = PlayerDeps::new(
//!     audio,
//!     video,
//!     Arc::new(MemoryKeyValueStore::new()),
//!     Arc::new(StaticConnectivity(Connectivity::wifi())),
//! );
//! let manager = PlayerManager::new(deps, &channel).await?;
//! let (player, _task) = spawn_player(manager, channel);
//!
//! let episode = NowPlayingItem::episode(
//!     EpisodeId::new("ep-1"),
//!     PodcastSource::catalog("pod-1"),
//!     "https://cdn.example.com/ep-1.mp3",
//!     MediaType::Audio,
//! );
//! player.load_item(episode, LoadOptions::default()).await?;
//! player.pause().await?;
//! # Ok(())
//! # }
//! ```

pub mod clip;
pub mod dispatcher;
pub mod engine;
mod error;
pub mod events;
pub mod history;
mod manager;
pub mod native;
pub mod queue;
pub mod selector;
mod task;
pub mod types;

// Public exports
pub use clip::{ClipBoundaryController, ClipCheck, CLIP_CHECK_INTERVAL};
pub use dispatcher::{spawn_player, PlayerChannel, PlayerCommand, PlayerHandle, PlayerMessage};
pub use engine::{AudioEngine, EngineKind, EngineLoad, PlaybackEngine, VideoEngine, MAX_VIDEO_RATE};
pub use error::{PlaybackError, Result};
pub use events::{EventBus, PlayerEvent};
pub use history::{
    merge_history, HistoryService, RecordOptions, RemoteHistory, COMPLETION_THRESHOLD_SECS,
};
pub use manager::{PlayerDeps, PlayerManager};
pub use native::{EngineEvent, EngineEventSink, NativePlayer, RemoteCommand};
pub use queue::QueueManager;
pub use selector::BackendSelector;
pub use task::SupersedingTask;
pub use types::{LoadOptions, PlayerConfig, PlayerState};
