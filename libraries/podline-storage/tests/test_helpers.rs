//! Test helpers and fixtures for storage integration tests
//!
//! Databases are REAL SQLite files (not in-memory) so migrations and the
//! pool settings behave as they do in production.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use podline_core::types::*;
use podline_storage::SqliteKeyValueStore;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

/// Test database wrapper that cleans up on drop
pub struct TestDb {
    pub pool: SqlitePool,
    _temp_dir: TempDir,
}

impl TestDb {
    /// Create a new test database with migrations applied
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let pool = podline_storage::create_pool(&db_url)
            .await
            .expect("Failed to create pool");

        podline_storage::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        Self {
            pool,
            _temp_dir: temp_dir,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn kv(&self) -> Arc<SqliteKeyValueStore> {
        Arc::new(SqliteKeyValueStore::new(self.pool.clone()))
    }
}

/// Test fixture: an episode history record
pub fn history_record(episode: &str, position: f64) -> HistoryItem {
    HistoryItem {
        identity: PlaybackIdentity::Episode(EpisodeId::new(episode)),
        item: Some(test_episode(episode)),
        media_file_duration: Some(1800.0),
        user_playback_position: position,
        completed: false,
        last_updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    }
}

/// Test fixture: a catalog episode item
pub fn test_episode(episode: &str) -> NowPlayingItem {
    NowPlayingItem::episode(
        EpisodeId::new(episode),
        PodcastSource::catalog("pod-1"),
        format!("https://cdn.example.com/{}.mp3", episode),
        MediaType::Audio,
    )
    .with_duration(1800.0)
}
