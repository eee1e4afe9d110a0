//! Podline Server Client
//!
//! HTTP client library for the podcast API.
//!
//! # Features
//!
//! - **History**: Upsert, page through and delete account listening history
//! - **Catalog**: Query new episodes for a set of podcasts
//! - **Media**: Stream episode enclosures to disk with progress reporting
//!
//! [`PodlineClient`] also implements the `podline-core` collaborator traits
//! (`RemoteHistoryApi`, `EpisodeCatalog`, `SessionProvider`) so it can be
//! handed straight to the playback and download services.
//!
//! # Example
//!
//! ```ignore
//! use podline_server_client::{PodlineClient, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::with_token("https://api.example.com/api/v1", "token");
//!     let client = PodlineClient::new(config)?;
//!
//!     let history = client.history().await?;
//!     let items = history.client().get_all_history_items().await?;
//!     println!("Found {} history items", items.len());
//!
//!     Ok(())
//! }
//! ```

mod catalog;
mod client;
mod error;
mod history;
mod media;
mod remote;
mod types;

// Re-export main types
pub use client::{CatalogClientHandle, HistoryClientHandle, MediaClientHandle, PodlineClient};
pub use error::{Result, ServerClientError};
pub use remote::FileMediaDownloader;
pub use types::{
    DownloadProgress, EpisodeListResponse, HistoryItemPatchRequest, HistoryItemsResponse,
    ServerConfig, ServerEpisode, ServerHistoryItem, ServerPodcastRef,
};

// Re-export sub-clients for direct use if needed
pub use catalog::CatalogClient;
pub use history::{HistoryClient, MAX_HISTORY_PAGES};
pub use media::MediaClient;
