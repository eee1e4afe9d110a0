//! Collaborator trait implementations backed by the HTTP client.

use crate::client::PodlineClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use podline_core::traits::{EpisodeCatalog, MediaDownloader, RemoteHistoryApi, SessionProvider};
use podline_core::types::{
    CatalogEpisode, EpisodeId, HistoryItem, PlaybackIdentity, RemoteHistoryUpdate,
};
use podline_core::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[async_trait]
impl RemoteHistoryApi for PodlineClient {
    async fn upsert_history_item(&self, update: &RemoteHistoryUpdate) -> Result<()> {
        let handle = self.history().await?;
        handle.client().update_history_item(update).await?;
        Ok(())
    }

    async fn fetch_history_items(&self) -> Result<Vec<HistoryItem>> {
        let handle = self.history().await?;
        Ok(handle.client().get_all_history_items().await?)
    }

    async fn remove_all_history_items(&self) -> Result<()> {
        let handle = self.history().await?;
        handle.client().remove_all().await?;
        Ok(())
    }

    async fn remove_history_item(&self, identity: &PlaybackIdentity) -> Result<()> {
        let handle = self.history().await?;
        handle.client().remove_item(identity).await?;
        Ok(())
    }
}

#[async_trait]
impl EpisodeCatalog for PodlineClient {
    async fn episodes_since(
        &self,
        since: DateTime<Utc>,
        podcast_keys: &[String],
    ) -> Result<Vec<CatalogEpisode>> {
        let handle = self.catalog().await;
        Ok(handle.client().episodes_since(since, podcast_keys).await?)
    }
}

#[async_trait]
impl SessionProvider for PodlineClient {
    async fn is_authenticated(&self) -> bool {
        PodlineClient::is_authenticated(self).await
    }

    async fn bearer_token(&self) -> Option<String> {
        self.token().await
    }
}

/// Writes episode media under a single directory, one file per episode.
#[derive(Clone)]
pub struct FileMediaDownloader {
    client: PodlineClient,
    dir: PathBuf,
}

impl FileMediaDownloader {
    pub fn new(client: PodlineClient, dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Target path for an episode, keeping the enclosure's extension.
    pub fn path_for(&self, episode: &CatalogEpisode) -> PathBuf {
        let extension = media_extension(&episode.media_url).unwrap_or_else(|| "mp3".to_string());
        self.dir
            .join(format!("{}.{}", episode.episode_id.as_str(), extension))
    }
}

fn media_extension(media_url: &str) -> Option<String> {
    let parsed = url::Url::parse(media_url).ok()?;
    let last = parsed.path_segments()?.last()?.to_string();
    let (_, ext) = last.rsplit_once('.')?;
    let valid = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}

#[async_trait]
impl MediaDownloader for FileMediaDownloader {
    async fn download(&self, episode: &CatalogEpisode) -> Result<PathBuf> {
        let dest = self.path_for(episode);
        let handle = self.client.media();
        let bytes = handle
            .client()
            .download_episode(
                episode.episode_id.as_str(),
                &episode.media_url,
                &dest,
                |progress| {
                    debug!(
                        episode_id = %progress.episode_id,
                        received = progress.bytes_received,
                        progress = progress.progress,
                        "Download progress"
                    );
                },
            )
            .await?;
        debug!(episode_id = %episode.episode_id, bytes, "Media written");
        Ok(dest)
    }

    async fn delete(&self, episode_id: &EpisodeId, path: Option<&Path>) -> Result<()> {
        let Some(path) = path else {
            debug!(episode_id = %episode_id, "No file recorded, nothing to delete");
            return Ok(());
        };
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(episode_id = %episode_id, path = %path.display(), "Media file already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_comes_from_url_path() {
        assert_eq!(
            media_extension("https://cdn.example.com/a/b/ep1.MP4?token=x"),
            Some("mp4".to_string())
        );
        assert_eq!(media_extension("https://cdn.example.com/stream"), None);
        assert_eq!(media_extension("not a url"), None);
    }
}
