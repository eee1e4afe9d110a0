//! Playback item model
//!
//! `NowPlayingItem` is the value handed to the player: either a full episode
//! or a clip (a bounded excerpt of an episode). Everything in this module is
//! pure and deterministic.

use super::ids::{ClipId, EpisodeId, PlaybackIdentity, PodcastId};
use crate::error::{PodError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of media behind an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaType {
    #[default]
    Audio,
    Video,
    LiveAudio,
    LiveVideo,
}

impl MediaType {
    pub fn is_video(self) -> bool {
        matches!(self, Self::Video | Self::LiveVideo)
    }

    pub fn is_live(self) -> bool {
        matches!(self, Self::LiveAudio | Self::LiveVideo)
    }

    /// Classify a feed enclosure MIME type (`video/mp4`, `audio/mpeg`, ...)
    pub fn from_mime_type(mime: &str, is_live: bool) -> Self {
        let is_video = mime.trim().to_ascii_lowercase().starts_with("video/");
        match (is_video, is_live) {
            (true, true) => Self::LiveVideo,
            (true, false) => Self::Video,
            (false, true) => Self::LiveAudio,
            (false, false) => Self::Audio,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::LiveAudio => "live-audio",
            Self::LiveVideo => "live-video",
        }
    }
}

/// Source podcast of an item
///
/// A podcast is either known to the catalog or was added directly by RSS URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PodcastSource {
    Catalog(PodcastId),
    ExternalFeed(String),
}

impl PodcastSource {
    pub fn catalog(id: impl Into<String>) -> Self {
        Self::Catalog(PodcastId::new(id))
    }

    pub fn external_feed(url: impl Into<String>) -> Self {
        Self::ExternalFeed(url.into())
    }

    /// Key used for per-podcast settings (catalog id or feed URL)
    pub fn key(&self) -> &str {
        match self {
            Self::Catalog(id) => id.as_str(),
            Self::ExternalFeed(url) => url,
        }
    }

    pub fn is_external_feed(&self) -> bool {
        matches!(self, Self::ExternalFeed(_))
    }
}

/// Result of [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub is_clip: bool,
    pub is_video: bool,
    pub is_live: bool,
}

/// The item currently loaded (or about to be loaded) into the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlayingItem {
    pub episode_id: Option<EpisodeId>,
    pub clip_id: Option<ClipId>,
    pub source: PodcastSource,
    pub media_url: String,
    #[serde(default)]
    pub media_type: MediaType,

    pub clip_start_time: Option<f64>,
    pub clip_end_time: Option<f64>,
    #[serde(default)]
    pub clip_title: Option<String>,
    #[serde(default)]
    pub clip_is_official_chapter: bool,

    #[serde(default)]
    pub episode_title: Option<String>,
    #[serde(default)]
    pub podcast_title: Option<String>,
    #[serde(default)]
    pub episode_pub_date: Option<DateTime<Utc>>,

    /// Media duration in seconds, when known
    pub duration: Option<f64>,
    /// Last known playback position in seconds
    #[serde(default)]
    pub user_playback_position: f64,
}

impl NowPlayingItem {
    /// Create a full-episode item
    pub fn episode(
        episode_id: EpisodeId,
        source: PodcastSource,
        media_url: impl Into<String>,
        media_type: MediaType,
    ) -> Self {
        Self {
            episode_id: Some(episode_id),
            clip_id: None,
            source,
            media_url: media_url.into(),
            media_type,
            clip_start_time: None,
            clip_end_time: None,
            clip_title: None,
            clip_is_official_chapter: false,
            episode_title: None,
            podcast_title: None,
            episode_pub_date: None,
            duration: None,
            user_playback_position: 0.0,
        }
    }

    /// Create a clip item; `end_time` of `None` is an open-ended clip
    pub fn clip(
        clip_id: ClipId,
        episode_id: Option<EpisodeId>,
        source: PodcastSource,
        media_url: impl Into<String>,
        media_type: MediaType,
        start_time: f64,
        end_time: Option<f64>,
    ) -> Self {
        Self {
            episode_id,
            clip_id: Some(clip_id),
            clip_start_time: Some(start_time),
            clip_end_time: end_time,
            user_playback_position: start_time,
            ..Self::episode(EpisodeId::new(""), source, media_url, media_type)
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_position(mut self, position: f64) -> Self {
        self.user_playback_position = position;
        self
    }

    pub fn with_titles(
        mut self,
        podcast_title: impl Into<String>,
        episode_title: impl Into<String>,
    ) -> Self {
        self.podcast_title = Some(podcast_title.into());
        self.episode_title = Some(episode_title.into());
        self
    }

    pub fn with_pub_date(mut self, pub_date: DateTime<Utc>) -> Self {
        self.episode_pub_date = Some(pub_date);
        self
    }

    pub fn as_official_chapter(mut self) -> Self {
        self.clip_is_official_chapter = true;
        self
    }

    /// Check the item invariants
    pub fn validate(&self) -> Result<()> {
        let has_episode = self
            .episode_id
            .as_ref()
            .is_some_and(|id| !id.as_str().is_empty());
        let has_clip = self
            .clip_id
            .as_ref()
            .is_some_and(|id| !id.as_str().is_empty());

        if !has_episode && !has_clip {
            return Err(PodError::invalid_item(
                "item needs an episode id or a clip id",
            ));
        }

        if self.media_url.trim().is_empty() {
            return Err(PodError::invalid_item("media url cannot be empty"));
        }

        for (name, value) in [
            ("clip start", self.clip_start_time),
            ("clip end", self.clip_end_time),
            ("duration", self.duration),
            ("position", Some(self.user_playback_position)),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(PodError::invalid_item(format!(
                        "{} must be a non-negative number, got {}",
                        name, v
                    )));
                }
            }
        }

        if has_clip {
            let Some(start) = self.clip_start_time else {
                return Err(PodError::invalid_item("clip requires a start time"));
            };
            if let Some(end) = self.clip_end_time {
                if end <= start {
                    return Err(PodError::invalid_item(format!(
                        "clip end {} must be after start {}",
                        end, start
                    )));
                }
            }
        }

        Ok(())
    }

    /// Identity used to key history and queue records
    ///
    /// A clip is keyed by its clip id even though it also knows its episode.
    pub fn identity(&self) -> Option<PlaybackIdentity> {
        if let Some(clip_id) = self.clip_id.as_ref().filter(|id| !id.as_str().is_empty()) {
            return Some(PlaybackIdentity::Clip(clip_id.clone()));
        }
        self.episode_id
            .as_ref()
            .filter(|id| !id.as_str().is_empty())
            .map(|id| PlaybackIdentity::Episode(id.clone()))
    }

    pub fn is_same_identity(&self, other: &NowPlayingItem) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn classify(&self) -> Classification {
        classify(self)
    }

    pub fn to_episode_projection(&self) -> NowPlayingItem {
        to_episode_projection(self)
    }

    pub fn display_title(&self) -> &str {
        self.clip_title
            .as_deref()
            .or(self.episode_title.as_deref())
            .unwrap_or("Untitled")
    }
}

/// Classify an item as clip / video / live
pub fn classify(item: &NowPlayingItem) -> Classification {
    Classification {
        is_clip: item.clip_id.is_some(),
        is_video: item.media_type.is_video(),
        is_live: item.media_type.is_live(),
    }
}

/// Project a clip onto its parent episode
///
/// Clip id, clip bounds and clip metadata are cleared; duration, position and
/// episode metadata carry over. Episode items come back unchanged.
pub fn to_episode_projection(item: &NowPlayingItem) -> NowPlayingItem {
    NowPlayingItem {
        clip_id: None,
        clip_start_time: None,
        clip_end_time: None,
        clip_title: None,
        clip_is_official_chapter: false,
        ..item.clone()
    }
}
