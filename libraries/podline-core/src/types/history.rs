/// Listening history records and the derived lookup index
use super::ids::{ClipId, EpisodeId, PlaybackIdentity};
use super::now_playing::NowPlayingItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Persisted listening progress for one episode or clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub identity: PlaybackIdentity,

    /// Snapshot of the item as last played; absent for server-only records
    #[serde(default)]
    pub item: Option<NowPlayingItem>,

    pub media_file_duration: Option<f64>,
    pub user_playback_position: f64,
    #[serde(default)]
    pub completed: bool,

    /// Order date: newest records sort first
    pub last_updated_at: DateTime<Utc>,
}

impl HistoryItem {
    pub fn episode_id(&self) -> Option<&EpisodeId> {
        match &self.identity {
            PlaybackIdentity::Episode(id) => Some(id),
            PlaybackIdentity::Clip(_) => self.item.as_ref().and_then(|i| i.episode_id.as_ref()),
        }
    }
}

/// Index entry for one identity
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryIndexEntry {
    pub media_file_duration: Option<f64>,
    pub user_playback_position: f64,
    pub completed: bool,
}

/// Lookup of history by identity, rebuilt from the history list
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryIndex {
    pub episodes: HashMap<EpisodeId, HistoryIndexEntry>,
    pub clips: HashMap<ClipId, HistoryIndexEntry>,
}

impl HistoryIndex {
    /// Fold a most-recent-first history list; the first record per identity wins
    pub fn from_items(items: &[HistoryItem]) -> Self {
        let mut index = Self::default();
        for item in items {
            let entry = HistoryIndexEntry {
                media_file_duration: item
                    .media_file_duration
                    .or_else(|| item.item.as_ref().and_then(|i| i.duration)),
                user_playback_position: item.user_playback_position,
                completed: item.completed,
            };
            match &item.identity {
                PlaybackIdentity::Episode(id) => {
                    index.episodes.entry(id.clone()).or_insert(entry);
                }
                PlaybackIdentity::Clip(id) => {
                    index.clips.entry(id.clone()).or_insert(entry);
                }
            }
        }
        index
    }

    pub fn get(&self, identity: &PlaybackIdentity) -> Option<&HistoryIndexEntry> {
        match identity {
            PlaybackIdentity::Episode(id) => self.episodes.get(id),
            PlaybackIdentity::Clip(id) => self.clips.get(id),
        }
    }

    pub fn len(&self) -> usize {
        self.episodes.len() + self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty() && self.clips.is_empty()
    }
}

/// Payload of a remote history upsert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteHistoryUpdate {
    pub identity: PlaybackIdentity,
    /// Whole seconds
    pub user_playback_position: f64,
    pub media_file_duration: Option<f64>,
    pub force_update_order_date: bool,
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(identity: PlaybackIdentity, position: f64, completed: bool) -> HistoryItem {
        HistoryItem {
            identity,
            item: None,
            media_file_duration: Some(120.0),
            user_playback_position: position,
            completed,
            last_updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_index_splits_episodes_and_clips() {
        let items = vec![
            record(PlaybackIdentity::Episode(EpisodeId::new("a")), 10.0, false),
            record(PlaybackIdentity::Clip(ClipId::new("c")), 40.0, false),
            record(PlaybackIdentity::Episode(EpisodeId::new("b")), 0.0, true),
        ];

        let index = HistoryIndex::from_items(&items);

        assert_eq!(index.len(), 3);
        assert_eq!(index.episodes[&EpisodeId::new("a")].user_playback_position, 10.0);
        assert!(index.episodes[&EpisodeId::new("b")].completed);
        assert_eq!(index.clips[&ClipId::new("c")].user_playback_position, 40.0);
    }

    #[test]
    fn test_index_keeps_most_recent_duplicate() {
        let id = PlaybackIdentity::Episode(EpisodeId::new("a"));
        let items = vec![record(id.clone(), 50.0, false), record(id.clone(), 5.0, false)];

        let index = HistoryIndex::from_items(&items);

        assert_eq!(index.get(&id).unwrap().user_playback_position, 50.0);
    }

    #[test]
    fn test_empty_index() {
        let index = HistoryIndex::from_items(&[]);
        assert!(index.is_empty());
    }
}
