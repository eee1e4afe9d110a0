mod chapter;
mod download;
mod history;
mod ids;
mod network;
mod now_playing;
mod queue;

pub use chapter::{
    chapter_at, next_chapter, previous_chapter, resolve_chapter_end_times, Chapter,
};
pub use download::{CatalogEpisode, DownloadRecord, DownloadState};
pub use history::{HistoryIndex, HistoryIndexEntry, HistoryItem, RemoteHistoryUpdate};
pub use ids::{ClipId, EpisodeId, PlaybackIdentity, PodcastId};
pub use network::{CellularGeneration, ConnectionType, Connectivity};
pub use now_playing::{
    classify, to_episode_projection, Classification, MediaType, NowPlayingItem, PodcastSource,
};
pub use queue::{AutoQueuePosition, QueueItem};
