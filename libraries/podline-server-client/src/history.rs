//! Account history routes.

use crate::error::{ensure_success, map_send_error, Result, ServerClientError};
use crate::types::{HistoryItemPatchRequest, HistoryItemsResponse};
use podline_core::types::{HistoryItem, PlaybackIdentity, RemoteHistoryUpdate};
use reqwest::Client;
use tracing::{debug, warn};

/// Upper bound on pages fetched by [`HistoryClient::get_all_history_items`].
pub const MAX_HISTORY_PAGES: u32 = 50;

/// History client for the podcast API.
pub struct HistoryClient<'a> {
    http: &'a Client,
    base_url: &'a str,
    access_token: &'a str,
}

impl<'a> HistoryClient<'a> {
    pub(crate) fn new(http: &'a Client, base_url: &'a str, access_token: &'a str) -> Self {
        Self {
            http,
            base_url,
            access_token,
        }
    }

    /// Upsert one history item (`PATCH /user-history-item`).
    pub async fn update_history_item(&self, update: &RemoteHistoryUpdate) -> Result<()> {
        let url = format!("{}/user-history-item", self.base_url);
        let body = HistoryItemPatchRequest::from(update);
        debug!(url = %url, identity = %update.identity, position = body.user_playback_position, "Updating history item");

        let response = self
            .http
            .patch(&url)
            .bearer_auth(self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        ensure_success(response).await?;
        Ok(())
    }

    /// Fetch one page of history (`GET /user-history-item?page=N`), 1-based.
    pub async fn get_history_items(&self, page: u32) -> Result<HistoryItemsResponse> {
        let url = format!("{}/user-history-item", self.base_url);
        debug!(url = %url, page, "Fetching history page");

        let response = self
            .http
            .get(&url)
            .query(&[("page", page)])
            .bearer_auth(self.access_token)
            .send()
            .await
            .map_err(map_send_error)?;

        let response = ensure_success(response).await?;
        response.json().await.map_err(|e| {
            ServerClientError::ParseError(format!("Failed to parse history response: {}", e))
        })
    }

    /// Fetch every page until the reported count is reached.
    pub async fn get_all_history_items(&self) -> Result<Vec<HistoryItem>> {
        let mut items = Vec::new();
        let mut received = 0usize;

        for page in 1..=MAX_HISTORY_PAGES {
            let response = self.get_history_items(page).await?;
            let page_len = response.user_history_items.len();
            received += page_len;

            items.extend(
                response
                    .user_history_items
                    .into_iter()
                    .filter_map(|item| item.into_history_item()),
            );

            if page_len == 0 || received >= response.user_history_items_count {
                return Ok(items);
            }
        }

        warn!(received, "History paging stopped at page cap");
        Ok(items)
    }

    /// Delete all account history (`DELETE /user-history-item/remove-all`).
    pub async fn remove_all(&self) -> Result<()> {
        let url = format!("{}/user-history-item/remove-all", self.base_url);
        debug!(url = %url, "Removing all history items");

        let response = self
            .http
            .delete(&url)
            .bearer_auth(self.access_token)
            .send()
            .await
            .map_err(map_send_error)?;

        ensure_success(response).await?;
        Ok(())
    }

    /// Delete one history item by episode or clip.
    pub async fn remove_item(&self, identity: &PlaybackIdentity) -> Result<()> {
        let url = match identity {
            PlaybackIdentity::Episode(id) => {
                format!("{}/user-history-item/episode/{}", self.base_url, id)
            }
            PlaybackIdentity::Clip(id) => {
                format!("{}/user-history-item/mediaRef/{}", self.base_url, id)
            }
        };
        debug!(url = %url, "Removing history item");

        let response = self
            .http
            .delete(&url)
            .bearer_auth(self.access_token)
            .send()
            .await
            .map_err(map_send_error)?;

        ensure_success(response).await?;
        Ok(())
    }
}
