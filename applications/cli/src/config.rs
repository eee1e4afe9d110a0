/// CLI configuration
use crate::error::{CliError, Result};
use podline_core::types::{CellularGeneration, Connectivity};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "podline.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_server")]
    pub server: ServerSettings,

    #[serde(default = "default_network")]
    pub network: NetworkSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Account token; without it history stays local
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NetworkSettings {
    /// Connectivity to assume, since a desktop host has no link probe
    #[serde(default = "default_connection")]
    pub connection: AssumedConnection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssumedConnection {
    Wifi,
    Cellular,
    Offline,
}

impl AssumedConnection {
    pub fn connectivity(self) -> Connectivity {
        match self {
            AssumedConnection::Wifi => Connectivity::wifi(),
            AssumedConnection::Cellular => Connectivity::cellular(CellularGeneration::G4),
            AssumedConnection::Offline => Connectivity::offline(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `podline.toml` and `PODLINE_` environment
    /// variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, environment())
    }

    pub(crate) fn load_with(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Nested keys use a double underscore: PODLINE_SERVER__ACCESS_TOKEN
        settings = settings.add_source(env);

        let config = settings
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.database_url.is_empty() {
            return Err(CliError::Config(
                "Database URL is required (set PODLINE_STORAGE__DATABASE_URL)".to_string(),
            ));
        }

        if !self.server.api_url.starts_with("http://")
            && !self.server.api_url.starts_with("https://")
        {
            return Err(CliError::Config(format!(
                "API URL must start with http:// or https://, got {:?}",
                self.server.api_url
            )));
        }

        if self.storage.download_dir.as_os_str().is_empty() {
            return Err(CliError::Config(
                "Download directory cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("PODLINE")
        .prefix_separator("_")
        .separator("__")
}

// Default values
fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
        download_dir: default_download_dir(),
    }
}

fn default_database_url() -> String {
    "sqlite://./data/podline.db".to_string()
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./data/episodes")
}

fn default_server() -> ServerSettings {
    ServerSettings {
        api_url: default_api_url(),
        access_token: None,
    }
}

fn default_api_url() -> String {
    "http://localhost:1234/api/v1".to_string()
}

fn default_network() -> NetworkSettings {
    NetworkSettings {
        connection: default_connection(),
    }
}

fn default_connection() -> AssumedConnection {
    AssumedConnection::Wifi
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: default_storage(),
            server: default_server(),
            network: default_network(),
        }
    }
}
