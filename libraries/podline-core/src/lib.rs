//! Podline Core
//!
//! Platform-agnostic value types, traits, and error handling for the Podline
//! playback engine.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Playback Item Model**: `NowPlayingItem`, its classification and the
//!   clip-to-episode projection
//! - **Records**: `HistoryItem`, `HistoryIndex`, `QueueItem`, `Chapter`,
//!   `DownloadRecord`
//! - **Collaborator Traits**: `KeyValueStore`, `ConnectivityProvider`,
//!   `SessionProvider`, `RemoteHistoryApi`, `EpisodeCatalog`, `MediaDownloader`
//! - **Error Handling**: Unified `PodError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use podline_core::types::{EpisodeId, ClipId, MediaType, NowPlayingItem, PodcastSource};
//!
//! let clip = NowPlayingItem::clip(
//!     ClipId::new("clip-1"),
//!     Some(EpisodeId::new("ep-1")),
//!     PodcastSource::catalog("pod-1"),
//!     "https://cdn.example.com/ep-1.mp3",
//!     MediaType::Audio,
//!     30.0,
//!     Some(60.0),
//! );
//!
//! assert!(clip.classify().is_clip);
//! let episode = clip.to_episode_projection();
//! assert!(episode.clip_id.is_none());
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod network;
pub mod storage;
pub mod traits;
pub mod types;

pub use error::{PodError, Result};
pub use storage::KeyValueStore;
pub use traits::{
    ConnectivityProvider, EpisodeCatalog, MediaDownloader, NextEpisodeLookup, RemoteHistoryApi,
    SessionProvider,
};

pub use types::{
    classify, to_episode_projection, CatalogEpisode, CellularGeneration, Chapter,
    Classification, ClipId, ConnectionType, Connectivity, DownloadRecord, DownloadState,
    EpisodeId, HistoryIndex, HistoryIndexEntry, HistoryItem, MediaType, NowPlayingItem,
    PlaybackIdentity, PodcastId, PodcastSource, QueueItem, RemoteHistoryUpdate,
};
