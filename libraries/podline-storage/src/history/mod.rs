//! Listening history persistence
//!
//! Only the history reconciliation service should write through this store.

use crate::json::{read_json, write_json};
use crate::keys::HISTORY_ITEMS;
use podline_core::{error::Result, HistoryItem, KeyValueStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct HistoryStore {
    kv: Arc<dyn KeyValueStore>,
}

impl HistoryStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// History records, most recent first; empty when unset or unreadable
    pub async fn load(&self) -> Result<Vec<HistoryItem>> {
        Ok(read_json(self.kv.as_ref(), HISTORY_ITEMS)
            .await?
            .unwrap_or_default())
    }

    pub async fn save(&self, items: &[HistoryItem]) -> Result<()> {
        write_json(self.kv.as_ref(), HISTORY_ITEMS, items).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.kv.remove(HISTORY_ITEMS).await
    }
}
