//! Enclosure downloads.

use crate::error::{ensure_success, map_send_error, Result};
use crate::types::DownloadProgress;
use futures_util::StreamExt;
use reqwest::Client;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub struct MediaClient<'a> {
    http: &'a Client,
}

impl<'a> MediaClient<'a> {
    pub(crate) fn new(http: &'a Client) -> Self {
        Self { http }
    }

    /// Stream an episode enclosure to `dest_path`.
    ///
    /// A partially written file is removed if the transfer fails.
    pub async fn download_episode<F>(
        &self,
        episode_id: &str,
        media_url: &str,
        dest_path: &Path,
        mut progress_callback: F,
    ) -> Result<u64>
    where
        F: FnMut(DownloadProgress),
    {
        debug!(url = %media_url, episode_id = %episode_id, dest = %dest_path.display(), "Downloading episode");

        let response = self
            .http
            .get(media_url)
            .send()
            .await
            .map_err(map_send_error)?;
        let response = ensure_success(response).await?;

        let total_size = response.content_length();

        if let Some(parent) = dest_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = File::create(dest_path).await?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(dest_path).await;
                    return Err(e.into());
                }
            };
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            let progress = total_size
                .map(|total| downloaded as f32 / total as f32)
                .unwrap_or(0.0);

            progress_callback(DownloadProgress {
                episode_id: episode_id.to_string(),
                bytes_received: downloaded,
                bytes_total: total_size,
                progress,
            });
        }

        file.flush().await?;

        info!(
            episode_id = %episode_id,
            dest = %dest_path.display(),
            size = downloaded,
            "Episode downloaded"
        );

        Ok(downloaded)
    }
}
