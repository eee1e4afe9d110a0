use crate::json::{read_json, write_json};
use crate::keys::{CLIP_HAS_ENDED, NOW_PLAYING_ITEM};
use podline_core::{error::Result, KeyValueStore, NowPlayingItem};
use std::sync::Arc;

/// Persisted now-playing item and clip boundary flag
#[derive(Clone)]
pub struct NowPlayingStore {
    kv: Arc<dyn KeyValueStore>,
}

impl NowPlayingStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn load(&self) -> Result<Option<NowPlayingItem>> {
        read_json(self.kv.as_ref(), NOW_PLAYING_ITEM).await
    }

    pub async fn save(&self, item: &NowPlayingItem) -> Result<()> {
        write_json(self.kv.as_ref(), NOW_PLAYING_ITEM, item).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.kv.remove(NOW_PLAYING_ITEM).await
    }

    pub async fn clip_has_ended(&self) -> Result<bool> {
        Ok(read_json(self.kv.as_ref(), CLIP_HAS_ENDED)
            .await?
            .unwrap_or(false))
    }

    pub async fn set_clip_has_ended(&self, ended: bool) -> Result<()> {
        if ended {
            write_json(self.kv.as_ref(), CLIP_HAS_ENDED, &true).await
        } else {
            self.kv.remove(CLIP_HAS_ENDED).await
        }
    }
}
