//! Error types for the podcast API client.

use podline_core::PodError;
use reqwest::Response;
use thiserror::Error;

/// Errors that can occur when talking to the podcast API.
#[derive(Error, Debug)]
pub enum ServerClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error response
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Authentication required but no token available, or token rejected
    #[error("Authentication required")]
    AuthRequired,

    /// Invalid server URL
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse server response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// IO error during download
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Server is offline or unreachable
    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),
}

/// Result type for server client operations.
pub type Result<T> = std::result::Result<T, ServerClientError>;

/// Map transport failures, separating "can't reach it" from other errors.
pub(crate) fn map_send_error(e: reqwest::Error) -> ServerClientError {
    if e.is_connect() || e.is_timeout() {
        ServerClientError::ServerUnreachable(e.to_string())
    } else {
        ServerClientError::Request(e)
    }
}

/// Turn a non-2xx response into an error; 401 means the token is missing or stale.
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.as_u16() == 401 {
        return Err(ServerClientError::AuthRequired);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ServerClientError::ServerError {
        status: status.as_u16(),
        message,
    })
}

impl From<ServerClientError> for PodError {
    fn from(err: ServerClientError) -> Self {
        match err {
            ServerClientError::AuthRequired => PodError::AuthRequired,
            ServerClientError::Io(e) => PodError::Io(e),
            ServerClientError::InvalidUrl(msg) => PodError::invalid_input(msg),
            other => PodError::network(other.to_string()),
        }
    }
}
