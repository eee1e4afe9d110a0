//! Public catalog routes.

use crate::error::{ensure_success, map_send_error, Result, ServerClientError};
use crate::types::{EpisodeListResponse, ServerEpisode};
use chrono::{DateTime, SecondsFormat, Utc};
use podline_core::types::CatalogEpisode;
use reqwest::Client;
use tracing::debug;

pub struct CatalogClient<'a> {
    http: &'a Client,
    base_url: &'a str,
}

impl<'a> CatalogClient<'a> {
    pub(crate) fn new(http: &'a Client, base_url: &'a str) -> Self {
        Self { http, base_url }
    }

    /// Episodes of the given podcasts published after `since`.
    pub async fn episodes_since(
        &self,
        since: DateTime<Utc>,
        podcast_ids: &[String],
    ) -> Result<Vec<CatalogEpisode>> {
        if podcast_ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/episode", self.base_url);
        let since_param = since.to_rfc3339_opts(SecondsFormat::Millis, true);
        let podcast_param = podcast_ids.join(",");
        debug!(url = %url, since = %since_param, podcasts = podcast_ids.len(), "Fetching new episodes");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("sincePubDate", since_param.as_str()),
                ("podcastId", podcast_param.as_str()),
                ("maxResults", "true"),
            ])
            .send()
            .await
            .map_err(map_send_error)?;

        let response = ensure_success(response).await?;
        let list: EpisodeListResponse = response.json().await.map_err(|e| {
            ServerClientError::ParseError(format!("Failed to parse episode list: {}", e))
        })?;

        let episodes: Vec<CatalogEpisode> = list
            .into_episodes()
            .into_iter()
            .filter_map(ServerEpisode::into_catalog_episode)
            .collect();

        debug!(count = episodes.len(), "Fetched new episodes");
        Ok(episodes)
    }
}
