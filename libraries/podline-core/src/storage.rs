//! Key-value storage trait
//!
//! All engine state (history, now playing, queue, downloads, settings) is
//! persisted as JSON strings under fixed keys. Implementations live in
//! `podline-storage`.

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a raw value; `Ok(None)` when the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key; deleting an absent key is not an error
    async fn remove(&self, key: &str) -> Result<()>;
}
