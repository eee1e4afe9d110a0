use podline_core::types::EpisodeId;
use podline_core::PodError;
use thiserror::Error;

/// Errors that can occur during download operations
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Download of episode {episode_id} failed: {message}")]
    Failed {
        episode_id: EpisodeId,
        message: String,
    },

    #[error("Catalog refresh failed: {0}")]
    Catalog(String),

    #[error(transparent)]
    Core(#[from] PodError),
}

pub type Result<T> = std::result::Result<T, DownloadError>;
