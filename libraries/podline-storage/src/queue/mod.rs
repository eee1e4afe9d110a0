use crate::json::{read_json, write_json};
use crate::keys::QUEUE_ITEMS;
use podline_core::{error::Result, KeyValueStore, NowPlayingItem};
use std::sync::Arc;

/// Persisted playback queue, in play order
#[derive(Clone)]
pub struct QueueStore {
    kv: Arc<dyn KeyValueStore>,
}

impl QueueStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn load(&self) -> Result<Vec<NowPlayingItem>> {
        Ok(read_json(self.kv.as_ref(), QUEUE_ITEMS)
            .await?
            .unwrap_or_default())
    }

    pub async fn save(&self, items: &[NowPlayingItem]) -> Result<()> {
        write_json(self.kv.as_ref(), QUEUE_ITEMS, items).await
    }
}
