//! Download records and per-podcast download policy

use crate::json::{read_json, write_json};
use crate::keys::{
    AUTO_DOWNLOADS_LAST_REFRESHED, AUTO_DOWNLOAD_SETTINGS, DOWNLOADED_EPISODES,
    DOWNLOADED_EPISODE_LIMITS, DOWNLOADED_EPISODE_LIMIT_DEFAULT,
};
use chrono::{DateTime, Utc};
use podline_core::{error::Result, DownloadRecord, EpisodeId, KeyValueStore};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct DownloadStore {
    kv: Arc<dyn KeyValueStore>,
}

impl DownloadStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    // ========================================================================
    // Episode records
    // ========================================================================

    pub async fn records(&self) -> Result<BTreeMap<EpisodeId, DownloadRecord>> {
        Ok(read_json(self.kv.as_ref(), DOWNLOADED_EPISODES)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_records(&self, records: &BTreeMap<EpisodeId, DownloadRecord>) -> Result<()> {
        write_json(self.kv.as_ref(), DOWNLOADED_EPISODES, records).await
    }

    pub async fn record(&self, episode_id: &EpisodeId) -> Result<Option<DownloadRecord>> {
        Ok(self.records().await?.remove(episode_id))
    }

    pub async fn upsert_record(&self, record: DownloadRecord) -> Result<()> {
        let mut records = self.records().await?;
        records.insert(record.episode_id.clone(), record);
        self.save_records(&records).await
    }

    pub async fn remove_record(&self, episode_id: &EpisodeId) -> Result<Option<DownloadRecord>> {
        let mut records = self.records().await?;
        let removed = records.remove(episode_id);
        if removed.is_some() {
            self.save_records(&records).await?;
        }
        Ok(removed)
    }

    // ========================================================================
    // Auto-download flags
    // ========================================================================

    pub async fn auto_download_settings(&self) -> Result<BTreeMap<String, bool>> {
        Ok(read_json(self.kv.as_ref(), AUTO_DOWNLOAD_SETTINGS)
            .await?
            .unwrap_or_default())
    }

    /// Podcast keys with auto-download switched on
    pub async fn auto_download_podcasts(&self) -> Result<Vec<String>> {
        Ok(self
            .auto_download_settings()
            .await?
            .into_iter()
            .filter_map(|(key, enabled)| enabled.then_some(key))
            .collect())
    }

    pub async fn is_auto_download_enabled(&self, podcast_key: &str) -> Result<bool> {
        Ok(self
            .auto_download_settings()
            .await?
            .get(podcast_key)
            .copied()
            .unwrap_or(false))
    }

    pub async fn set_auto_download(&self, podcast_key: &str, enabled: bool) -> Result<()> {
        let mut settings = self.auto_download_settings().await?;
        settings.insert(podcast_key.to_string(), enabled);
        write_json(self.kv.as_ref(), AUTO_DOWNLOAD_SETTINGS, &settings).await
    }

    /// Forget the podcast entirely (e.g. on unsubscribe)
    pub async fn remove_auto_download(&self, podcast_key: &str) -> Result<()> {
        let mut settings = self.auto_download_settings().await?;
        if settings.remove(podcast_key).is_some() {
            write_json(self.kv.as_ref(), AUTO_DOWNLOAD_SETTINGS, &settings).await?;
        }
        Ok(())
    }

    // ========================================================================
    // Downloaded-episode limits
    // ========================================================================

    pub async fn default_episode_limit(&self) -> Result<u32> {
        Ok(read_json(self.kv.as_ref(), DOWNLOADED_EPISODE_LIMIT_DEFAULT)
            .await?
            .unwrap_or(0))
    }

    pub async fn set_default_episode_limit(&self, limit: u32) -> Result<()> {
        write_json(self.kv.as_ref(), DOWNLOADED_EPISODE_LIMIT_DEFAULT, &limit).await
    }

    /// Effective limit for a podcast; 0 means unlimited
    pub async fn episode_limit(&self, podcast_key: &str) -> Result<u32> {
        let limits: BTreeMap<String, u32> = read_json(self.kv.as_ref(), DOWNLOADED_EPISODE_LIMITS)
            .await?
            .unwrap_or_default();
        match limits.get(podcast_key) {
            Some(limit) => Ok(*limit),
            None => self.default_episode_limit().await,
        }
    }

    pub async fn set_episode_limit(&self, podcast_key: &str, limit: u32) -> Result<()> {
        let mut limits: BTreeMap<String, u32> =
            read_json(self.kv.as_ref(), DOWNLOADED_EPISODE_LIMITS)
                .await?
                .unwrap_or_default();
        limits.insert(podcast_key.to_string(), limit);
        write_json(self.kv.as_ref(), DOWNLOADED_EPISODE_LIMITS, &limits).await
    }

    // ========================================================================
    // Refresh cursor
    // ========================================================================

    pub async fn last_refreshed(&self) -> Result<Option<DateTime<Utc>>> {
        read_json(self.kv.as_ref(), AUTO_DOWNLOADS_LAST_REFRESHED).await
    }

    pub async fn set_last_refreshed(&self, at: DateTime<Utc>) -> Result<()> {
        write_json(self.kv.as_ref(), AUTO_DOWNLOADS_LAST_REFRESHED, &at).await
    }
}
