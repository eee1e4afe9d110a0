//! Playback queue
//!
//! An ordered list of items waiting to play, written through to
//! [`QueueStore`] on every mutation:
//!
//! ```text
//! Now Playing: Episode A          (not in the queue)
//! ─────────────────────────────
//! Queue:
//!   0 - Episode B                 <- dequeue_next()
//!   1 - Clip C
//!   2 - Episode D                 <- enqueue_last() appends here
//! ```
//!
//! An identity appears at most once. Enqueuing something that is already
//! queued moves it.

use crate::error::{PlaybackError, Result};
use crate::events::{EventBus, PlayerEvent};
use podline_core::types::{
    AutoQueuePosition, CatalogEpisode, NowPlayingItem, PlaybackIdentity, QueueItem,
};
use podline_storage::{QueueStore, SettingsStore};
use tracing::{debug, info};

pub struct QueueManager {
    store: QueueStore,
    events: EventBus,
    items: Vec<NowPlayingItem>,
}

impl QueueManager {
    /// Load the persisted queue
    ///
    /// Entries without an identity, or repeating an earlier identity, are
    /// dropped on load.
    pub async fn load(store: QueueStore, events: EventBus) -> Result<Self> {
        let mut items: Vec<NowPlayingItem> = Vec::new();
        for item in store.load().await? {
            let Some(identity) = item.identity() else {
                continue;
            };
            if items.iter().any(|q| q.identity().as_ref() == Some(&identity)) {
                continue;
            }
            items.push(item);
        }
        debug!(length = items.len(), "Queue loaded");
        Ok(Self {
            store,
            events,
            items,
        })
    }

    /// Put `item` at the front
    pub async fn enqueue_next(&mut self, item: NowPlayingItem) -> Result<()> {
        let identity = require_identity(&item)?;
        let mut next = self.without(&identity);
        next.insert(0, item);
        self.commit(next).await
    }

    /// Put `item` at the back
    pub async fn enqueue_last(&mut self, item: NowPlayingItem) -> Result<()> {
        let identity = require_identity(&item)?;
        let mut next = self.without(&identity);
        next.push(item);
        self.commit(next).await
    }

    /// Insert a newly published episode without moving anything already queued
    ///
    /// Returns `false` when the item was already queued.
    pub async fn auto_enqueue(
        &mut self,
        item: NowPlayingItem,
        position: AutoQueuePosition,
    ) -> Result<bool> {
        let identity = require_identity(&item)?;
        if self.contains(&identity) {
            return Ok(false);
        }
        let mut next = self.items.clone();
        match position {
            AutoQueuePosition::First => next.insert(0, item),
            AutoQueuePosition::Last => next.push(item),
        }
        self.commit(next).await?;
        Ok(true)
    }

    /// Auto-queue new episodes of podcasts that have auto-queue enabled
    ///
    /// Episodes keep their relative order at either end of the queue.
    /// Returns how many were added.
    pub async fn auto_enqueue_new_episodes(
        &mut self,
        episodes: &[CatalogEpisode],
        settings: &SettingsStore,
    ) -> Result<usize> {
        let position = settings.auto_queue_position().await?;
        let mut selected = Vec::new();
        for episode in episodes {
            if settings.is_auto_queue_enabled(episode.source.key()).await? {
                selected.push(episode.to_now_playing());
            }
        }
        if position == AutoQueuePosition::First {
            selected.reverse();
        }

        let mut added = 0;
        for item in selected {
            if self.auto_enqueue(item, position).await? {
                added += 1;
            }
        }
        if added > 0 {
            info!(added, ?position, "Auto-queued new episodes");
        }
        Ok(added)
    }

    /// Take the front item
    pub async fn dequeue_next(&mut self) -> Result<Option<NowPlayingItem>> {
        if self.items.is_empty() {
            return Ok(None);
        }
        let mut next = self.items.clone();
        let item = next.remove(0);
        self.commit(next).await?;
        Ok(Some(item))
    }

    pub fn peek_next(&self) -> Option<&NowPlayingItem> {
        self.items.first()
    }

    /// Remove by identity; returns whether anything was removed
    pub async fn remove(&mut self, identity: &PlaybackIdentity) -> Result<bool> {
        if !self.contains(identity) {
            return Ok(false);
        }
        let next = self.without(identity);
        self.commit(next).await?;
        Ok(true)
    }

    /// Move the item at `from` to `to`
    pub async fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.items.len();
        if from >= len {
            return Err(PlaybackError::IndexOutOfBounds(from));
        }
        if to >= len {
            return Err(PlaybackError::IndexOutOfBounds(to));
        }
        if from == to {
            return Ok(());
        }
        let mut next = self.items.clone();
        let item = next.remove(from);
        next.insert(to, item);
        self.commit(next).await
    }

    pub async fn clear(&mut self) -> Result<()> {
        self.commit(Vec::new()).await
    }

    pub fn items(&self) -> Vec<QueueItem> {
        self.items
            .iter()
            .enumerate()
            .map(|(position, item)| QueueItem {
                item: item.clone(),
                position,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, identity: &PlaybackIdentity) -> bool {
        self.items
            .iter()
            .any(|item| item.identity().as_ref() == Some(identity))
    }

    fn without(&self, identity: &PlaybackIdentity) -> Vec<NowPlayingItem> {
        self.items
            .iter()
            .filter(|item| item.identity().as_ref() != Some(identity))
            .cloned()
            .collect()
    }

    /// Persist first, then swap in memory, so a failed write changes nothing
    async fn commit(&mut self, next: Vec<NowPlayingItem>) -> Result<()> {
        self.store.save(&next).await?;
        self.items = next;
        self.events.emit(PlayerEvent::QueueUpdated {
            length: self.items.len(),
        });
        Ok(())
    }
}

fn require_identity(item: &NowPlayingItem) -> Result<PlaybackIdentity> {
    item.identity()
        .ok_or_else(|| PlaybackError::InvalidItem("queued item needs an episode or clip id".into()))
}
