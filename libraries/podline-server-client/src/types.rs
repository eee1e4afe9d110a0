//! Types for podcast API requests and responses.

use chrono::{DateTime, Utc};
use podline_core::types::{
    CatalogEpisode, ClipId, EpisodeId, HistoryItem, MediaType, NowPlayingItem, PlaybackIdentity,
    PodcastSource, RemoteHistoryUpdate,
};
use serde::{Deserialize, Serialize};

/// Configuration for connecting to the podcast API.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base URL of the API (e.g., "https://api.example.com/api/v1")
    pub url: String,
    /// Bearer token for account-scoped routes
    pub access_token: Option<String>,
}

impl ServerConfig {
    /// Create a new server config with just the URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            access_token: None,
        }
    }

    /// Create a config with an existing token.
    pub fn with_token(url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            access_token: Some(access_token.into()),
        }
    }
}

// =============================================================================
// History Types
// =============================================================================

/// Body of `PATCH /user-history-item`.
///
/// `episodeId` is null whenever `mediaRefId` (the clip id) is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItemPatchRequest {
    pub episode_id: Option<String>,
    pub media_ref_id: Option<String>,
    pub user_playback_position: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_file_duration: Option<u64>,
    pub force_update_order_date: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl From<&RemoteHistoryUpdate> for HistoryItemPatchRequest {
    fn from(update: &RemoteHistoryUpdate) -> Self {
        let (episode_id, media_ref_id) = match &update.identity {
            PlaybackIdentity::Episode(id) => (Some(id.to_string()), None),
            PlaybackIdentity::Clip(id) => (None, Some(id.to_string())),
        };
        Self {
            episode_id,
            media_ref_id,
            user_playback_position: update.user_playback_position.max(0.0).floor() as u64,
            media_file_duration: update
                .media_file_duration
                .filter(|d| *d > 0.0)
                .map(|d| d.floor() as u64),
            force_update_order_date: update.force_update_order_date,
            completed: update.completed.then_some(true),
        }
    }
}

/// One history record as the server returns it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerHistoryItem {
    pub episode_id: Option<String>,
    #[serde(alias = "mediaRefId")]
    pub clip_id: Option<String>,
    pub clip_start_time: Option<f64>,
    pub clip_end_time: Option<f64>,
    pub clip_title: Option<String>,
    pub episode_media_url: Option<String>,
    pub episode_title: Option<String>,
    pub episode_pub_date: Option<DateTime<Utc>>,
    pub podcast_id: Option<String>,
    pub podcast_title: Option<String>,
    pub user_playback_position: Option<f64>,
    pub media_file_duration: Option<f64>,
    pub completed: Option<bool>,
    pub order_changed_date: Option<DateTime<Utc>>,
}

impl ServerHistoryItem {
    /// Convert into a local record; `None` when the server sent no identity.
    pub fn into_history_item(self) -> Option<HistoryItem> {
        let identity = match (&self.clip_id, &self.episode_id) {
            (Some(clip), _) if !clip.is_empty() => PlaybackIdentity::Clip(ClipId::new(clip.clone())),
            (_, Some(episode)) if !episode.is_empty() => {
                PlaybackIdentity::Episode(EpisodeId::new(episode.clone()))
            }
            _ => return None,
        };

        let item = match (&self.podcast_id, &self.episode_media_url) {
            (Some(podcast_id), Some(media_url)) => {
                let source = PodcastSource::catalog(podcast_id.clone());
                let mut item = match &identity {
                    PlaybackIdentity::Clip(clip_id) => NowPlayingItem::clip(
                        clip_id.clone(),
                        self.episode_id.clone().map(EpisodeId::new),
                        source,
                        media_url.clone(),
                        MediaType::Audio,
                        self.clip_start_time.unwrap_or(0.0),
                        self.clip_end_time,
                    ),
                    PlaybackIdentity::Episode(episode_id) => NowPlayingItem::episode(
                        episode_id.clone(),
                        source,
                        media_url.clone(),
                        MediaType::Audio,
                    ),
                };
                item.clip_title = self.clip_title.clone();
                item.episode_title = self.episode_title.clone();
                item.podcast_title = self.podcast_title.clone();
                item.episode_pub_date = self.episode_pub_date;
                item.duration = self.media_file_duration;
                Some(item)
            }
            _ => None,
        };

        let completed = self.completed.unwrap_or(false);
        Some(HistoryItem {
            identity,
            item,
            media_file_duration: self.media_file_duration,
            user_playback_position: if completed {
                0.0
            } else {
                self.user_playback_position.unwrap_or(0.0)
            },
            completed,
            last_updated_at: self.order_changed_date.unwrap_or_else(Utc::now),
        })
    }
}

/// Response from `GET /user-history-item`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItemsResponse {
    #[serde(default)]
    pub user_history_items: Vec<ServerHistoryItem>,
    #[serde(default)]
    pub user_history_items_count: usize,
}

// =============================================================================
// Catalog Types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPodcastRef {
    pub id: String,
    pub title: Option<String>,
}

/// Episode as returned by `GET /episode`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEpisode {
    pub id: String,
    pub title: Option<String>,
    pub media_url: String,
    /// Enclosure MIME type
    pub media_type: Option<String>,
    pub pub_date: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    #[serde(default)]
    pub live_item: Option<serde_json::Value>,
    pub podcast: Option<ServerPodcastRef>,
    pub podcast_id: Option<String>,
}

impl ServerEpisode {
    /// Convert into a catalog episode; `None` when no podcast is attached.
    pub fn into_catalog_episode(self) -> Option<CatalogEpisode> {
        let (podcast_id, podcast_title) = match (self.podcast, self.podcast_id) {
            (Some(podcast), _) => (podcast.id, podcast.title),
            (None, Some(id)) => (id, None),
            (None, None) => return None,
        };
        let is_live = self.live_item.as_ref().is_some_and(|v| !v.is_null());
        Some(CatalogEpisode {
            episode_id: EpisodeId::new(self.id),
            source: PodcastSource::catalog(podcast_id),
            title: self.title,
            podcast_title,
            media_url: self.media_url,
            media_type: MediaType::from_mime_type(self.media_type.as_deref().unwrap_or(""), is_live),
            pub_date: self.pub_date,
            duration: self.duration,
        })
    }
}

/// List endpoints answer either `[items, count]` or a bare list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EpisodeListResponse {
    Paged(Vec<ServerEpisode>, u64),
    Plain(Vec<ServerEpisode>),
}

impl EpisodeListResponse {
    pub fn into_episodes(self) -> Vec<ServerEpisode> {
        match self {
            Self::Paged(episodes, _) | Self::Plain(episodes) => episodes,
        }
    }
}

// =============================================================================
// Download Types
// =============================================================================

/// Download progress information.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    pub episode_id: String,
    pub bytes_received: u64,
    pub bytes_total: Option<u64>,
    /// Progress from 0.0 to 1.0; 0.0 when the size is unknown
    pub progress: f32,
}
