//! Playback backend selection
//!
//! [`BackendSelector`] owns both engines, picks one per load and is the only
//! writer of the now-playing item.

use crate::engine::{EngineKind, EngineLoad, PlaybackEngine};
use crate::error::{PlaybackError, Result};
use crate::events::{EventBus, PlayerEvent};
use crate::history::{HistoryService, RecordOptions};
use crate::types::{LoadOptions, PlayerState};
use podline_core::types::NowPlayingItem;
use podline_core::PodError;
use podline_storage::NowPlayingStore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct BackendSelector {
    audio: Box<dyn PlaybackEngine>,
    video: Box<dyn PlaybackEngine>,
    active: Option<EngineKind>,
    now_playing: Option<NowPlayingItem>,
    state: PlayerState,
    store: NowPlayingStore,
    history: Arc<HistoryService>,
    events: EventBus,
}

impl BackendSelector {
    pub fn new(
        audio: Box<dyn PlaybackEngine>,
        video: Box<dyn PlaybackEngine>,
        store: NowPlayingStore,
        history: Arc<HistoryService>,
        events: EventBus,
    ) -> Self {
        Self {
            audio,
            video,
            active: None,
            now_playing: None,
            state: PlayerState::Idle,
            store,
            history,
            events,
        }
    }

    fn engine(&self, kind: EngineKind) -> &dyn PlaybackEngine {
        match kind {
            EngineKind::Audio => self.audio.as_ref(),
            EngineKind::Video => self.video.as_ref(),
        }
    }

    fn active_engine(&self) -> Result<&dyn PlaybackEngine> {
        self.active
            .map(|kind| self.engine(kind))
            .ok_or(PlaybackError::NoItemLoaded)
    }

    pub fn now_playing(&self) -> Option<&NowPlayingItem> {
        self.now_playing.as_ref()
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn active_kind(&self) -> Option<EngineKind> {
        self.active
    }

    pub(crate) fn set_state(&mut self, state: PlayerState) {
        if self.state == state {
            return;
        }
        debug!(from = ?self.state, to = ?state, "Player state changed");
        self.state = state;
        self.events.emit(PlayerEvent::PlaybackStateChanged { state });
    }

    /// Load `item` into the backend that plays its media type
    ///
    /// The previous item's position is flushed first. On a backend error the
    /// previous item, state and position are left as they were.
    pub async fn load(&mut self, item: NowPlayingItem, options: LoadOptions) -> Result<()> {
        item.validate().map_err(|e| match e {
            PodError::InvalidItem(message) => PlaybackError::InvalidItem(message),
            other => PlaybackError::Core(other),
        })?;
        let identity = item
            .identity()
            .ok_or_else(|| PlaybackError::InvalidItem("item has no identity".into()))?;

        if let Err(e) = self.persist_current_position().await {
            warn!(error = %e, "Failed to flush position before load");
        }

        let kind = EngineKind::for_item(&item);
        let previous_kind = self.active;
        let prior_state = self.state;
        let mut paused_previous = false;
        if let Some(previous) = previous_kind.filter(|k| *k != kind) {
            debug!(from = ?previous, to = ?kind, "Switching backend");
            match self.engine(previous).pause().await {
                Ok(()) => paused_previous = true,
                Err(e) => warn!(error = %e, "Failed to pause previous backend"),
            }
        }

        self.set_state(PlayerState::Loading);
        let load = EngineLoad {
            start_position: item.user_playback_position,
            should_play: options.should_play,
            queue_next: options.item_to_queue_next.clone(),
        };
        let loaded = self.engine(kind).load(&item, &load).await;
        if let Err(e) = loaded {
            error!(identity = %identity, error = %e, "Backend failed to load item");
            if paused_previous && prior_state.is_playing() {
                if let Some(previous) = previous_kind {
                    if let Err(e) = self.engine(previous).play().await {
                        warn!(error = %e, "Failed to resume previous backend");
                    }
                }
            }
            self.set_state(prior_state);
            return Err(PlaybackError::Load {
                identity: identity.to_string(),
                message: e.to_string(),
            });
        }

        let previous_identity = self.now_playing.as_ref().and_then(|i| i.identity());
        self.active = Some(kind);
        self.now_playing = Some(item.clone());
        if let Err(e) = self.store.save(&item).await {
            warn!(error = %e, "Failed to persist now playing item");
        }

        self.set_state(if options.should_play {
            PlayerState::Playing
        } else {
            PlayerState::Ready
        });

        let record_options = RecordOptions {
            force_update_order_date: options.force_update_order_date,
            completed: false,
        };
        if let Err(e) = self
            .history
            .record_position(&item, item.user_playback_position, item.duration, record_options)
            .await
        {
            warn!(identity = %identity, error = %e, "Failed to record history on load");
        }

        info!(identity = %identity, backend = ?kind, position = item.user_playback_position, "Item loaded");
        self.events.emit(PlayerEvent::TrackChanged {
            identity,
            previous: previous_identity,
        });
        Ok(())
    }

    /// Flush the current item's position to history
    ///
    /// Uses the completion rule and keeps the record's place in the order.
    pub async fn persist_current_position(&mut self) -> Result<()> {
        let Some(kind) = self.active else {
            return Ok(());
        };
        let Some(item) = self.now_playing.as_mut() else {
            return Ok(());
        };

        let engine = match kind {
            EngineKind::Audio => self.audio.as_ref(),
            EngineKind::Video => self.video.as_ref(),
        };
        let position = engine.position().await;
        let duration = engine.duration().await.or(item.duration);

        item.user_playback_position = position;
        if item.duration.is_none() {
            item.duration = duration;
        }
        if let Err(e) = self.store.save(item).await {
            warn!(error = %e, "Failed to persist now playing position");
        }

        self.history.save_or_reset(item, position, duration).await?;
        Ok(())
    }

    /// Take over an item the native queue already advanced to
    pub async fn adopt_native_track(&mut self, item: NowPlayingItem) -> Result<()> {
        self.replace_now_playing(item).await?;
        if let Some(current) = self.now_playing.clone() {
            if let Err(e) = self
                .history
                .record_position(
                    &current,
                    current.user_playback_position,
                    current.duration,
                    RecordOptions::default(),
                )
                .await
            {
                warn!(error = %e, "Failed to record history for native track change");
            }
        }
        Ok(())
    }

    /// Swap the now-playing item without reloading the backend
    ///
    /// Used when the media stays the same, such as the clip to episode
    /// handoff.
    pub async fn replace_now_playing(&mut self, item: NowPlayingItem) -> Result<()> {
        let identity = item
            .identity()
            .ok_or_else(|| PlaybackError::InvalidItem("item has no identity".into()))?;
        let previous = self.now_playing.as_ref().and_then(|i| i.identity());

        if let Err(e) = self.store.save(&item).await {
            warn!(error = %e, "Failed to persist now playing item");
        }
        self.now_playing = Some(item);
        self.events.emit(PlayerEvent::TrackChanged { identity, previous });
        Ok(())
    }

    /// Forget the current item without flushing it
    ///
    /// For end-of-track, where the item was just marked completed.
    pub(crate) fn release_current(&mut self) -> Option<NowPlayingItem> {
        self.now_playing.take()
    }

    /// Stop everything and go idle
    pub async fn clear(&mut self) -> Result<()> {
        if let Some(kind) = self.active.take() {
            if let Err(e) = self.engine(kind).stop().await {
                warn!(error = %e, "Failed to stop backend");
            }
        }
        self.now_playing = None;
        self.store.clear().await?;
        self.set_state(PlayerState::Idle);
        Ok(())
    }

    /// Terminal end of playback with nothing to advance to
    pub async fn finish(&mut self) -> Result<()> {
        self.now_playing = None;
        self.store.clear().await?;
        self.set_state(PlayerState::Ended);
        Ok(())
    }

    pub async fn play(&mut self) -> Result<()> {
        if self.now_playing.is_none() {
            return Err(PlaybackError::NoItemLoaded);
        }
        self.active_engine()?
            .play()
            .await
            .map_err(PlaybackError::engine)?;
        self.set_state(PlayerState::Playing);
        Ok(())
    }

    pub async fn pause(&mut self) -> Result<()> {
        if self.now_playing.is_none() {
            return Err(PlaybackError::NoItemLoaded);
        }
        self.active_engine()?
            .pause()
            .await
            .map_err(PlaybackError::engine)?;
        self.set_state(PlayerState::Paused);
        Ok(())
    }

    pub async fn seek_to(&mut self, position: f64) -> Result<()> {
        if self.now_playing.is_none() {
            return Err(PlaybackError::NoItemLoaded);
        }
        let position = position.max(0.0);
        self.active_engine()?
            .seek_to(position)
            .await
            .map_err(PlaybackError::engine)?;
        if let Some(item) = self.now_playing.as_mut() {
            item.user_playback_position = position;
        }
        Ok(())
    }

    pub async fn position(&self) -> f64 {
        match self.active {
            Some(kind) if self.now_playing.is_some() => self.engine(kind).position().await,
            _ => 0.0,
        }
    }

    pub async fn duration(&self) -> Option<f64> {
        let from_item = self.now_playing.as_ref().and_then(|i| i.duration);
        match self.active {
            Some(kind) => self.engine(kind).duration().await.or(from_item),
            None => from_item,
        }
    }

    pub async fn rate(&self) -> f64 {
        match self.active {
            Some(kind) => self.engine(kind).rate().await,
            None => 1.0,
        }
    }

    /// Apply a rate to the active backend; returns the rate it accepted
    pub async fn set_rate(&mut self, rate: f64) -> Result<f64> {
        self.active_engine()?
            .set_rate(rate)
            .await
            .map_err(PlaybackError::engine)
    }

    /// Offer the next queued item to the active backend's native queue
    pub async fn enqueue_native_next(&self, item: &NowPlayingItem) -> Result<()> {
        self.active_engine()?
            .enqueue_next(item)
            .await
            .map_err(PlaybackError::engine)
    }

    /// State report from a native player; reports from the inactive backend
    /// are ignored
    pub fn handle_native_state(&mut self, kind: EngineKind, state: PlayerState) -> bool {
        if self.active != Some(kind) {
            debug!(?kind, ?state, "Ignoring state from inactive backend");
            return false;
        }
        self.set_state(state);
        true
    }
}
