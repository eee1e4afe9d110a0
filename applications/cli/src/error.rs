/// CLI error types
use podline_core::PodError;
use podline_downloads::DownloadError;
use podline_playback::PlaybackError;
use podline_server_client::ServerClientError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Core(#[from] PodError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Server client error: {0}")]
    Client(#[from] ServerClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
