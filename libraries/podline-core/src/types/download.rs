/// Download bookkeeping and catalog episode types
use super::ids::EpisodeId;
use super::now_playing::{MediaType, NowPlayingItem, PodcastSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Persisted per-episode download record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    pub episode_id: EpisodeId,
    pub podcast_key: String,
    #[serde(default)]
    pub is_downloading: bool,
    #[serde(default)]
    pub is_downloaded: bool,
    pub pub_date: Option<DateTime<Utc>>,
    pub downloaded_at: Option<DateTime<Utc>>,
    pub file_path: Option<PathBuf>,
}

impl DownloadRecord {
    pub fn downloading(episode: &CatalogEpisode) -> Self {
        Self {
            episode_id: episode.episode_id.clone(),
            podcast_key: episode.source.key().to_string(),
            is_downloading: true,
            is_downloaded: false,
            pub_date: episode.pub_date,
            downloaded_at: None,
            file_path: None,
        }
    }

    /// Downloading or already on disk
    pub fn is_present(&self) -> bool {
        self.is_downloading || self.is_downloaded
    }
}

/// Download status of one episode combined with its podcast's policy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadState {
    pub is_downloading: bool,
    pub is_downloaded: bool,
    pub auto_download_enabled: bool,
    /// 0 means unlimited
    pub downloaded_episode_limit: u32,
    pub file_path: Option<PathBuf>,
}

/// An episode reported by the podcast catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEpisode {
    pub episode_id: EpisodeId,
    pub source: PodcastSource,
    pub title: Option<String>,
    pub podcast_title: Option<String>,
    pub media_url: String,
    #[serde(default)]
    pub media_type: MediaType,
    pub pub_date: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
}

impl CatalogEpisode {
    pub fn to_now_playing(&self) -> NowPlayingItem {
        let mut item = NowPlayingItem::episode(
            self.episode_id.clone(),
            self.source.clone(),
            self.media_url.clone(),
            self.media_type,
        );
        item.episode_title = self.title.clone();
        item.podcast_title = self.podcast_title.clone();
        item.episode_pub_date = self.pub_date;
        item.duration = self.duration;
        item
    }
}
