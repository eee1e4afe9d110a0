//! Podline Storage
//!
//! Persistent key-value layer for the Podline engine.
//!
//! Every piece of engine state is a JSON document under a fixed key
//! (see [`keys`]). Two backends implement [`KeyValueStore`]:
//! - [`SqliteKeyValueStore`]: `SQLite` via `sqlx`, for real installs
//! - [`MemoryKeyValueStore`]: in-process map, for tests and ephemeral sessions
//!
//! # Architecture
//!
//! - **Vertical Slicing**: each engine component gets a narrow typed store
//!   (`HistoryStore`, `NowPlayingStore`, `QueueStore`, `DownloadStore`,
//!   `SettingsStore`) instead of reaching into a shared global
//! - **Forgiving Reads**: malformed stored documents read back as empty
//!
//! # Example
//!
//! ```rust,no_run
//! use podline_storage::{create_pool, run_migrations, SqliteKeyValueStore, SettingsStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://podline.db").await?;
//! run_migrations(&pool).await?;
//!
//! let kv = Arc::new(SqliteKeyValueStore::new(pool));
//! let settings = SettingsStore::new(kv);
//! let jump = settings.jump_backwards_seconds().await?;
//! # Ok(())
//! # }
//! ```

mod context;
mod error;
mod json;
mod memory;

pub mod keys;

// Vertical slices
pub mod downloads;
pub mod history;
pub mod now_playing;
pub mod queue;
pub mod settings;

pub use context::SqliteKeyValueStore;
pub use downloads::DownloadStore;
pub use error::StorageError;
pub use history::HistoryStore;
pub use memory::MemoryKeyValueStore;
pub use now_playing::NowPlayingStore;
pub use podline_core::KeyValueStore;
pub use queue::QueueStore;
pub use settings::SettingsStore;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;
use tracing::debug;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// Call once at startup, before handing the pool to [`SqliteKeyValueStore`].
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://podline.db>`)
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    debug!(url = %database_url, "Creating SQLite pool");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    debug!("SQLite pool ready");

    Ok(pool)
}
