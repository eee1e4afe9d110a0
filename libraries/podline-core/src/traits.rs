/// Collaborator traits the engine is wired against
use crate::error::Result;
use crate::types::{
    CatalogEpisode, Connectivity, EpisodeId, HistoryItem, NowPlayingItem, PlaybackIdentity,
    RemoteHistoryUpdate,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Source of the current connectivity snapshot
#[async_trait]
pub trait ConnectivityProvider: Send + Sync {
    async fn connectivity(&self) -> Connectivity;
}

/// Account session state
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn is_authenticated(&self) -> bool;

    async fn bearer_token(&self) -> Option<String>;
}

/// Account-scoped history store on the server
#[async_trait]
pub trait RemoteHistoryApi: Send + Sync {
    async fn upsert_history_item(&self, update: &RemoteHistoryUpdate) -> Result<()>;

    async fn fetch_history_items(&self) -> Result<Vec<HistoryItem>>;

    async fn remove_all_history_items(&self) -> Result<()>;

    async fn remove_history_item(&self, identity: &PlaybackIdentity) -> Result<()>;
}

/// Podcast catalog queries used by the download scheduler
#[async_trait]
pub trait EpisodeCatalog: Send + Sync {
    /// Episodes published after `since` for the given podcast keys
    async fn episodes_since(
        &self,
        since: DateTime<Utc>,
        podcast_keys: &[String],
    ) -> Result<Vec<CatalogEpisode>>;
}

/// Fetches and deletes episode media files
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Download the episode and return where it was written
    async fn download(&self, episode: &CatalogEpisode) -> Result<PathBuf>;

    async fn delete(&self, episode_id: &EpisodeId, path: Option<&Path>) -> Result<()>;
}

/// Finds the episode to continue with when the queue runs out
#[async_trait]
pub trait NextEpisodeLookup: Send + Sync {
    async fn next_episode(&self, current: &NowPlayingItem) -> Result<Option<NowPlayingItem>>;
}
