//! Wiring of stores, remote client and services for one CLI invocation

use crate::config::AppConfig;
use crate::error::{CliError, Result};
use podline_core::network::StaticConnectivity;
use podline_core::{ConnectivityProvider, KeyValueStore};
use podline_downloads::DownloadScheduler;
use podline_playback::{EventBus, HistoryService, QueueManager, RemoteHistory};
use podline_server_client::{FileMediaDownloader, PodlineClient, ServerConfig};
use podline_storage::{
    DownloadStore, HistoryStore, QueueStore, SettingsStore, SqliteKeyValueStore,
};
use std::sync::Arc;
use tracing::{debug, info};

pub struct App {
    kv: Arc<dyn KeyValueStore>,
    events: EventBus,
    pub history: HistoryService,
    pub scheduler: DownloadScheduler,
    pub settings: SettingsStore,
}

impl App {
    /// Open the SQLite store named in the config and wire everything to it
    pub async fn open(config: &AppConfig) -> Result<Self> {
        let pool = podline_storage::create_pool(&config.storage.database_url)
            .await
            .map_err(|e| CliError::Database(e.to_string()))?;
        podline_storage::run_migrations(&pool)
            .await
            .map_err(|e| CliError::Database(e.to_string()))?;
        info!(url = %config.storage.database_url, "Database ready");

        Self::with_store(config, Arc::new(SqliteKeyValueStore::new(pool)))
    }

    pub fn with_store(config: &AppConfig, kv: Arc<dyn KeyValueStore>) -> Result<Self> {
        let server = match &config.server.access_token {
            Some(token) => ServerConfig::with_token(&config.server.api_url, token),
            None => ServerConfig::new(&config.server.api_url),
        };
        let client = PodlineClient::new(server)?;
        let connectivity: Arc<dyn ConnectivityProvider> = Arc::new(StaticConnectivity(
            config.network.connection.connectivity(),
        ));
        let events = EventBus::default();
        let settings = SettingsStore::new(kv.clone());

        let mut history = HistoryService::new(
            HistoryStore::new(kv.clone()),
            settings.clone(),
            connectivity.clone(),
            events.clone(),
        );
        if config.server.access_token.is_some() {
            let client = Arc::new(client.clone());
            history = history.with_remote(RemoteHistory {
                api: client.clone(),
                session: client,
            });
        } else {
            debug!("No access token configured, history stays local");
        }

        let scheduler = DownloadScheduler::new(
            DownloadStore::new(kv.clone()),
            settings.clone(),
            connectivity,
            Arc::new(client.clone()),
            Arc::new(FileMediaDownloader::new(
                client,
                config.storage.download_dir.clone(),
            )),
        );

        Ok(Self {
            kv,
            events,
            history,
            scheduler,
            settings,
        })
    }

    /// Load the persisted queue
    pub async fn queue(&self) -> Result<QueueManager> {
        Ok(QueueManager::load(QueueStore::new(self.kv.clone()), self.events.clone()).await?)
    }

    pub fn downloads(&self) -> DownloadStore {
        DownloadStore::new(self.kv.clone())
    }

    /// Wait for server writes started by this invocation
    pub async fn finish(&self) {
        self.history.remote_writes_idle().await;
    }
}
