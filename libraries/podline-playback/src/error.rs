//! Error types for the player core

use podline_core::PodError;
use thiserror::Error;

/// Player errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No item is currently loaded
    #[error("No item loaded")]
    NoItemLoaded,

    /// Item failed validation or has no identity
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    /// The backend refused to load the item; prior state is untouched
    #[error("Failed to load {identity}: {message}")]
    Load { identity: String, message: String },

    /// Index out of bounds
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// Native engine error outside of a load
    #[error("Engine error: {0}")]
    Engine(String),

    /// The dispatcher task has stopped
    #[error("Player dispatcher is not running")]
    DispatcherClosed,

    #[error(transparent)]
    Core(#[from] PodError),
}

impl PlaybackError {
    pub(crate) fn engine(err: PodError) -> Self {
        match err {
            PodError::Engine(msg) => Self::Engine(msg),
            other => Self::Core(other),
        }
    }
}

impl From<PlaybackError> for PodError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::Core(e) => e,
            PlaybackError::InvalidItem(msg) => PodError::InvalidItem(msg),
            PlaybackError::Engine(msg) => PodError::Engine(msg),
            other => PodError::Other(other.to_string()),
        }
    }
}

/// Result type for player operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
