//! Main podcast API client.

use crate::catalog::CatalogClient;
use crate::error::{Result, ServerClientError};
use crate::history::HistoryClient;
use crate::media::MediaClient;
use crate::types::ServerConfig;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

/// Client for the podcast API.
///
/// Holds the base URL and the account token, and hands out short-lived
/// sub-clients for history, catalog and media operations.
///
/// # Example
///
/// ```ignore
/// use podline_server_client::{PodlineClient, ServerConfig};
///
/// let client = PodlineClient::new(ServerConfig::with_token("https://api.example.com/api/v1", "token"))?;
///
/// let history = client.history().await?;
/// let items = history.client().get_all_history_items().await?;
/// println!("{} history items", items.len());
/// ```
#[derive(Clone)]
pub struct PodlineClient {
    http: Client,
    config: Arc<RwLock<ServerConfig>>,
}

impl PodlineClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ServerConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(ServerClientError::InvalidUrl("URL cannot be empty".into()));
        }

        let url = config.url.trim_end_matches('/').to_string();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ServerClientError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }
        url::Url::parse(&url).map_err(|e| ServerClientError::InvalidUrl(e.to_string()))?;

        let normalized_config = ServerConfig {
            url,
            access_token: config.access_token,
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("Podline/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ServerClientError::Request)?;

        Ok(Self {
            http,
            config: Arc::new(RwLock::new(normalized_config)),
        })
    }

    /// Get the API base URL.
    pub async fn url(&self) -> String {
        self.config.read().await.url.clone()
    }

    /// Check if the client has an access token.
    pub async fn is_authenticated(&self) -> bool {
        self.config.read().await.access_token.is_some()
    }

    /// Set the token directly (e.g., from stored credentials).
    pub async fn set_token(&self, access_token: impl Into<String>) {
        self.config.write().await.access_token = Some(access_token.into());
    }

    pub async fn token(&self) -> Option<String> {
        self.config.read().await.access_token.clone()
    }

    /// Clear the stored token (logout).
    pub async fn logout(&self) {
        self.config.write().await.access_token = None;
        info!("Logged out");
    }

    /// Get a history client for account-scoped history routes.
    ///
    /// Returns an error if not authenticated.
    pub async fn history(&self) -> Result<HistoryClientHandle> {
        let config = self.config.read().await;
        let access_token = config
            .access_token
            .clone()
            .ok_or(ServerClientError::AuthRequired)?;
        let url = config.url.clone();
        drop(config);

        Ok(HistoryClientHandle {
            http: self.http.clone(),
            url,
            access_token,
        })
    }

    /// Get a catalog client. Catalog routes are public.
    pub async fn catalog(&self) -> CatalogClientHandle {
        CatalogClientHandle {
            http: self.http.clone(),
            url: self.url().await,
        }
    }

    /// Get a media client for downloading enclosures.
    pub fn media(&self) -> MediaClientHandle {
        MediaClientHandle {
            http: self.http.clone(),
        }
    }
}

/// Handle for history operations.
pub struct HistoryClientHandle {
    http: Client,
    url: String,
    access_token: String,
}

impl HistoryClientHandle {
    pub fn client(&self) -> HistoryClient<'_> {
        HistoryClient::new(&self.http, &self.url, &self.access_token)
    }
}

/// Handle for catalog operations.
pub struct CatalogClientHandle {
    http: Client,
    url: String,
}

impl CatalogClientHandle {
    pub fn client(&self) -> CatalogClient<'_> {
        CatalogClient::new(&self.http, &self.url)
    }
}

/// Handle for media downloads.
pub struct MediaClientHandle {
    http: Client,
}

impl MediaClientHandle {
    pub fn client(&self) -> MediaClient<'_> {
        MediaClient::new(&self.http)
    }
}
