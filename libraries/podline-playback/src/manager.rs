//! Player manager - core orchestration
//!
//! Coordinates the backend selector, clip boundaries, history and queue.
//! A single dispatcher task owns the manager (see [`crate::dispatcher`]), so
//! every method here runs to completion before the next message is handled.

use crate::clip::{ClipBoundaryController, ClipCheck};
use crate::dispatcher::PlayerChannel;
use crate::engine::{AudioEngine, EngineKind, VideoEngine};
use crate::error::{PlaybackError, Result};
use crate::events::{EventBus, PlayerEvent};
use crate::history::{HistoryService, RecordOptions, RemoteHistory};
use crate::native::{EngineEvent, NativePlayer, RemoteCommand};
use crate::queue::QueueManager;
use crate::selector::BackendSelector;
use crate::types::{LoadOptions, PlayerConfig, PlayerState};
use podline_core::traits::{
    ConnectivityProvider, NextEpisodeLookup, RemoteHistoryApi, SessionProvider,
};
use podline_core::types::{
    next_chapter, previous_chapter, resolve_chapter_end_times, CatalogEpisode, Chapter,
    HistoryIndex, NowPlayingItem, PlaybackIdentity, QueueItem,
};
use podline_core::{KeyValueStore, PodError};
use podline_storage::settings::{DEFAULT_JUMP_BACKWARDS_SECONDS, DEFAULT_JUMP_FORWARDS_SECONDS};
use podline_storage::{HistoryStore, NowPlayingStore, QueueStore, SettingsStore};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Everything the player is wired against
pub struct PlayerDeps {
    pub audio: Arc<dyn NativePlayer>,
    pub video: Arc<dyn NativePlayer>,
    pub kv: Arc<dyn KeyValueStore>,
    pub connectivity: Arc<dyn ConnectivityProvider>,
    pub remote: Option<RemoteHistory>,
    pub next_episode: Option<Arc<dyn NextEpisodeLookup>>,
    pub config: PlayerConfig,
}

impl PlayerDeps {
    pub fn new(
        audio: Arc<dyn NativePlayer>,
        video: Arc<dyn NativePlayer>,
        kv: Arc<dyn KeyValueStore>,
        connectivity: Arc<dyn ConnectivityProvider>,
    ) -> Self {
        Self {
            audio,
            video,
            kv,
            connectivity,
            remote: None,
            next_episode: None,
            config: PlayerConfig::default(),
        }
    }

    pub fn with_remote(
        mut self,
        api: Arc<dyn RemoteHistoryApi>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        self.remote = Some(RemoteHistory { api, session });
        self
    }

    pub fn with_next_episode(mut self, lookup: Arc<dyn NextEpisodeLookup>) -> Self {
        self.next_episode = Some(lookup);
        self
    }

    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }
}

/// Player manager
///
/// Responsibilities:
/// - Loading items, resuming from history, and the clip to episode handoff
/// - Flushing positions on pause, seek, background and item switches
/// - Advancing through the queue when an item ends
/// - Remote-control and audio-focus handling
/// - Chapter navigation
pub struct PlayerManager {
    selector: BackendSelector,
    clip: ClipBoundaryController,
    history: Arc<HistoryService>,
    queue: QueueManager,
    settings: SettingsStore,
    now_playing_store: NowPlayingStore,
    events: EventBus,
    next_episode: Option<Arc<dyn NextEpisodeLookup>>,
    chapters: Vec<Chapter>,
    /// Most recent clip loaded, kept across the handoff for replay
    last_clip: Option<NowPlayingItem>,
    was_paused_by_duck: bool,
    config: PlayerConfig,
}

impl PlayerManager {
    /// Build the player and load the persisted queue
    pub async fn new(deps: PlayerDeps, channel: &PlayerChannel) -> Result<Self> {
        let config = deps.config;
        let events = EventBus::new(config.event_capacity);
        let settings = SettingsStore::new(deps.kv.clone());
        let now_playing_store = NowPlayingStore::new(deps.kv.clone());

        let mut history = HistoryService::new(
            HistoryStore::new(deps.kv.clone()),
            settings.clone(),
            deps.connectivity,
            events.clone(),
        )
        .with_completion_threshold(config.completion_threshold_secs);
        if let Some(remote) = deps.remote {
            history = history.with_remote(remote);
        }
        let history = Arc::new(history);

        let selector = BackendSelector::new(
            Box::new(AudioEngine::new(deps.audio)),
            Box::new(VideoEngine::new(deps.video)),
            now_playing_store.clone(),
            history.clone(),
            events.clone(),
        );
        let clip = ClipBoundaryController::new(
            now_playing_store.clone(),
            channel.weak_sender(),
            config.clip_check_interval,
        );
        let queue = QueueManager::load(QueueStore::new(deps.kv), events.clone()).await?;

        Ok(Self {
            selector,
            clip,
            history,
            queue,
            settings,
            now_playing_store,
            events,
            next_episode: deps.next_episode,
            chapters: Vec::new(),
            last_clip: None,
            was_paused_by_duck: false,
            config,
        })
    }

    // ===== Accessors =====

    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub fn history(&self) -> &Arc<HistoryService> {
        &self.history
    }

    pub fn queue(&self) -> &QueueManager {
        &self.queue
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn clip(&self) -> &ClipBoundaryController {
        &self.clip
    }

    pub fn state(&self) -> PlayerState {
        self.selector.state()
    }

    pub fn active_backend(&self) -> Option<EngineKind> {
        self.selector.active_kind()
    }

    pub fn now_playing(&self) -> Option<NowPlayingItem> {
        self.selector.now_playing().cloned()
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    // ===== Loading =====

    /// Load an item, resuming from history where it applies
    ///
    /// An official-chapter clip of the episode already playing is a seek
    /// within that episode, not a new load.
    pub async fn load_item(
        &mut self,
        mut item: NowPlayingItem,
        mut options: LoadOptions,
    ) -> Result<()> {
        if self.is_chapter_of_current(&item) {
            let start = item.clip_start_time.unwrap_or(0.0);
            debug!(start, "Official chapter of current episode, seeking");
            return self.seek_to(start).await;
        }

        if item.clip_id.is_none() {
            self.resume_from_history(&mut item).await;
        }

        let previous = match self.selector.now_playing().cloned() {
            Some(mut previous) => {
                previous.user_playback_position = self.selector.position().await;
                Some(previous)
            }
            None => None,
        };

        if options.item_to_queue_next.is_none() {
            options.item_to_queue_next = self
                .queue
                .items()
                .into_iter()
                .map(|q| q.item)
                .find(|next| !next.is_same_identity(&item));
        }

        self.selector.load(item.clone(), options).await?;

        self.chapters.clear();
        self.was_paused_by_duck = false;
        self.clip.arm(&item).await;
        self.last_clip = item.clip_id.is_some().then(|| item.clone());

        if let Some(identity) = item.identity() {
            if let Err(e) = self.queue.remove(&identity).await {
                warn!(identity = %identity, error = %e, "Failed to remove loaded item from queue");
            }
        }

        if let Some(previous) = previous.filter(|p| !p.is_same_identity(&item)) {
            if self
                .settings
                .add_current_item_next_in_queue()
                .await
                .unwrap_or(false)
            {
                if let Err(e) = self.queue.enqueue_next(previous).await {
                    warn!(error = %e, "Failed to queue previous item");
                }
            }
        }

        self.apply_saved_rate().await;
        Ok(())
    }

    /// Reload the last now-playing item, paused
    ///
    /// Returns whether anything was restored. An invalid stored item is
    /// discarded.
    pub async fn restore(&mut self) -> Result<bool> {
        let Some(item) = self.now_playing_store.load().await? else {
            return Ok(false);
        };
        if let Err(e) = item.validate() {
            warn!(error = %e, "Discarding invalid stored now playing item");
            self.now_playing_store.clear().await?;
            return Ok(false);
        }
        info!(identity = ?item.identity(), "Restoring now playing item");
        self.load_item(item, LoadOptions::paused()).await?;
        Ok(true)
    }

    fn is_chapter_of_current(&self, item: &NowPlayingItem) -> bool {
        let Some(current) = self.selector.now_playing() else {
            return false;
        };
        item.clip_is_official_chapter
            && item.clip_start_time.is_some()
            && current.clip_id.is_none()
            && item.episode_id.is_some()
            && item.episode_id == current.episode_id
    }

    async fn resume_from_history(&self, item: &mut NowPlayingItem) {
        let Some(identity) = item.identity() else {
            return;
        };
        let index = match self.history.get_index().await {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "Failed to read history index");
                return;
            }
        };
        if let Some(entry) = index.get(&identity) {
            if !entry.completed && entry.user_playback_position > 0.0 {
                item.user_playback_position = entry.user_playback_position;
            }
            if item.duration.is_none() {
                item.duration = entry.media_file_duration;
            }
        }
    }

    async fn apply_saved_rate(&mut self) {
        let rate = match self.settings.playback_speed().await {
            Ok(rate) => rate,
            Err(e) => {
                warn!(error = %e, "Failed to read playback speed");
                return;
            }
        };
        if let Err(e) = self.selector.set_rate(rate).await {
            warn!(rate, error = %e, "Failed to apply playback speed");
        }
    }

    // ===== Transport =====

    pub async fn play(&mut self) -> Result<()> {
        self.selector.play().await
    }

    /// Pause and flush the position
    pub async fn pause(&mut self) -> Result<()> {
        self.selector.pause().await?;
        self.flush_position().await;
        Ok(())
    }

    pub async fn toggle_play(&mut self) -> Result<()> {
        if self.selector.state().is_playing() {
            self.pause().await
        } else {
            self.play().await
        }
    }

    /// Seek, flush the position and check the clip end
    pub async fn seek_to(&mut self, position: f64) -> Result<()> {
        self.selector.seek_to(position).await?;
        self.flush_position().await;
        self.check_clip_boundary().await?;
        Ok(())
    }

    /// Jump back `seconds`, or the configured amount when `None`
    pub async fn jump_backward(&mut self, seconds: Option<u32>) -> Result<()> {
        let seconds = match seconds {
            Some(seconds) => seconds,
            None => self
                .settings
                .jump_backwards_seconds()
                .await
                .unwrap_or(DEFAULT_JUMP_BACKWARDS_SECONDS),
        };
        let position = self.selector.position().await;
        self.seek_to((position - f64::from(seconds)).max(0.0)).await
    }

    /// Jump ahead `seconds`, or the configured amount when `None`
    pub async fn jump_forward(&mut self, seconds: Option<u32>) -> Result<()> {
        let seconds = match seconds {
            Some(seconds) => seconds,
            None => self
                .settings
                .jump_forwards_seconds()
                .await
                .unwrap_or(DEFAULT_JUMP_FORWARDS_SECONDS),
        };
        let mut position = self.selector.position().await + f64::from(seconds);
        if let Some(duration) = self.selector.duration().await {
            position = position.min(duration);
        }
        self.seek_to(position).await
    }

    /// Persist the current position without changing transport
    pub async fn record_position_now(&mut self) -> Result<()> {
        self.selector.persist_current_position().await
    }

    /// Set and apply the playback speed; returns the rate the backend took
    pub async fn set_playback_speed(&mut self, rate: f64) -> Result<f64> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PodError::invalid_input(format!("invalid playback speed {}", rate)).into());
        }
        self.settings.set_playback_speed(rate).await?;
        if self.selector.now_playing().is_none() {
            return Ok(rate);
        }
        self.selector.set_rate(rate).await
    }

    pub async fn clear_now_playing(&mut self) -> Result<()> {
        self.flush_position().await;
        self.clip.disarm();
        self.chapters.clear();
        self.last_clip = None;
        self.was_paused_by_duck = false;
        self.selector.clear().await
    }

    async fn flush_position(&mut self) {
        if let Err(e) = self.selector.persist_current_position().await {
            warn!(error = %e, "Failed to persist playback position");
        }
    }

    // ===== App lifecycle =====

    /// Flush before the app is suspended; awaited so it lands first
    pub async fn app_backgrounded(&mut self) -> Result<()> {
        debug!("App backgrounded, flushing position");
        self.selector.persist_current_position().await
    }

    /// Catch up on anything missed while suspended
    pub async fn app_foregrounded(&mut self) -> Result<()> {
        debug!("App foregrounded");
        self.check_clip_boundary().await?;
        Ok(())
    }

    // ===== History and queue =====

    pub async fn get_history_index(&self) -> Result<HistoryIndex> {
        self.history.get_index().await
    }

    pub async fn enqueue_next(&mut self, item: NowPlayingItem) -> Result<()> {
        self.queue.enqueue_next(item).await?;
        self.offer_native_next().await;
        Ok(())
    }

    pub async fn enqueue_last(&mut self, item: NowPlayingItem) -> Result<()> {
        self.queue.enqueue_last(item).await?;
        if self.queue.len() == 1 {
            self.offer_native_next().await;
        }
        Ok(())
    }

    pub async fn remove_from_queue(&mut self, identity: &PlaybackIdentity) -> Result<bool> {
        self.queue.remove(identity).await
    }

    pub async fn reorder_queue(&mut self, from: usize, to: usize) -> Result<()> {
        self.queue.reorder(from, to).await
    }

    pub async fn clear_queue(&mut self) -> Result<()> {
        self.queue.clear().await
    }

    pub fn queue_items(&self) -> Vec<QueueItem> {
        self.queue.items()
    }

    /// Auto-queue newly published episodes per the auto-queue settings
    pub async fn handle_new_episodes(&mut self, episodes: &[CatalogEpisode]) -> Result<usize> {
        let added = self
            .queue
            .auto_enqueue_new_episodes(episodes, &self.settings)
            .await?;
        if added > 0 {
            self.offer_native_next().await;
        }
        Ok(added)
    }

    async fn offer_native_next(&self) {
        let (Some(current), Some(next)) = (self.selector.now_playing(), self.queue.peek_next())
        else {
            return;
        };
        if current.is_same_identity(next) {
            return;
        }
        if let Err(e) = self.selector.enqueue_native_next(next).await {
            warn!(error = %e, "Failed to hand next item to backend");
        }
    }

    // ===== Chapters =====

    pub fn set_chapters(&mut self, chapters: Vec<Chapter>) {
        self.chapters = resolve_chapter_end_times(chapters);
    }

    /// Skip forward: next chapter, else near the end, else next queued item
    ///
    /// Returns whether a new item was loaded.
    pub async fn next(&mut self) -> Result<bool> {
        let position = self.selector.position().await;

        if self.chapters.len() >= 2 {
            if let Some(start) = next_chapter(&self.chapters, position).map(|c| c.start_time) {
                self.seek_to(start).await?;
                return Ok(false);
            }
        }

        if !self.chapters.is_empty() {
            if let Some(duration) = self.selector.duration().await {
                let target = (duration - self.config.skip_to_end_offset_secs).max(0.0);
                self.seek_to(target).await?;
                return Ok(false);
            }
        }

        self.play_next_in_queue().await
    }

    /// Skip back: previous chapter, else the start of the item
    pub async fn previous(&mut self) -> Result<()> {
        let position = self.selector.position().await;
        let target = previous_chapter(&self.chapters, position)
            .map(|c| c.start_time)
            .unwrap_or(0.0);
        self.seek_to(target).await
    }

    async fn play_next_in_queue(&mut self) -> Result<bool> {
        let Some(next) = self.queue.dequeue_next().await? else {
            debug!("Queue empty, nothing to skip to");
            return Ok(false);
        };
        self.load_item(next, LoadOptions::default()).await?;
        Ok(true)
    }

    // ===== Clip boundaries =====

    /// Check the armed clip against the current position
    ///
    /// On the first crossing playback pauses, `ClipEnded` is emitted and
    /// the handoff is queued on the dispatcher. Returns whether it crossed.
    pub async fn check_clip_boundary(&mut self) -> Result<bool> {
        if !self.clip.is_armed() {
            return Ok(false);
        }
        let position = self.selector.position().await;
        let ClipCheck::Crossed {
            session,
            clip_id,
            episode_id,
        } = self.clip.check(position).await
        else {
            return Ok(false);
        };

        if let Err(e) = self.selector.pause().await {
            warn!(error = %e, "Failed to pause at clip end");
        }
        self.events
            .emit(PlayerEvent::ClipEnded { clip_id, episode_id });
        self.clip.request_handoff(session);
        Ok(true)
    }

    /// Play the current clip again from its start
    ///
    /// Works while the clip is loaded and after it has been handed off to
    /// its episode. The clip gets a fresh session, so its end fires again.
    pub async fn restart_clip(&mut self) -> Result<()> {
        let current = self
            .selector
            .now_playing()
            .cloned()
            .ok_or(PlaybackError::NoItemLoaded)?;
        let clip = if current.clip_id.is_some() {
            current.clone()
        } else {
            self.last_clip
                .clone()
                .filter(|c| c.episode_id.is_some() && c.episode_id == current.episode_id)
                .ok_or_else(|| PlaybackError::InvalidItem("no clip to restart".into()))?
        };

        if !clip.is_same_identity(&current) {
            self.selector.replace_now_playing(clip.clone()).await?;
        }
        self.clip.arm(&clip).await;
        self.last_clip = Some(clip.clone());

        let start = clip.clip_start_time.unwrap_or(0.0);
        info!(clip_id = ?clip.clip_id, start, "Restarting clip");
        self.seek_to(start).await?;
        self.selector.play().await
    }

    pub async fn handle_clip_tick(&mut self, session: u64) -> Result<()> {
        if !self.clip.accepts_tick(session) {
            debug!(session, current = self.clip.session(), "Ignoring stale clip tick");
            return Ok(());
        }
        self.check_clip_boundary().await?;
        Ok(())
    }

    /// Hand a finished clip over to its episode and keep playing
    pub async fn resume_after_clip_ended(&mut self, session: u64) -> Result<()> {
        if session != self.clip.session() {
            debug!(session, "Ignoring clip handoff from an old session");
            return Ok(());
        }
        let Some(current) = self.selector.now_playing().cloned() else {
            return Ok(());
        };
        if current.clip_id.is_none() {
            return Ok(());
        }

        self.clip.disarm();
        let position = self.selector.position().await;
        let duration = self.selector.duration().await;

        let mut episode = current.to_episode_projection();
        episode.user_playback_position = position;
        if episode.duration.is_none() {
            episode.duration = duration;
        }
        if episode.identity().is_none() {
            warn!("Clip has no parent episode, staying paused");
            return Ok(());
        }

        if let Err(e) = self
            .history
            .record_position(&episode, position, duration, RecordOptions::default())
            .await
        {
            warn!(error = %e, "Failed to record episode position after clip");
        }

        info!(episode_id = ?episode.episode_id, position, "Clip ended, continuing with episode");
        self.selector.replace_now_playing(episode).await?;
        self.selector.play().await
    }

    // ===== Engine events =====

    pub async fn handle_engine_event(&mut self, kind: EngineKind, event: EngineEvent) -> Result<()> {
        match event {
            EngineEvent::Remote(command) => self.handle_remote(command).await,
            _ if self.selector.active_kind() != Some(kind) => {
                debug!(?kind, ?event, "Ignoring event from inactive backend");
                Ok(())
            }
            EngineEvent::TrackChanged {
                next,
                last_position,
            } => self.handle_track_changed(next, last_position).await,
            EngineEvent::QueueEnded | EngineEvent::StateChanged(PlayerState::Ended) => {
                self.handle_track_ended().await
            }
            EngineEvent::StateChanged(state) => {
                self.selector.handle_native_state(kind, state);
                Ok(())
            }
            EngineEvent::PlaybackError(message) => {
                error!(?kind, message = %message, "Backend reported an error");
                self.events.emit(PlayerEvent::PlaybackError { message });
                Ok(())
            }
        }
    }

    async fn handle_track_changed(
        &mut self,
        next: Option<NowPlayingItem>,
        last_position: f64,
    ) -> Result<()> {
        if let Some(previous) = self.selector.now_playing().cloned() {
            if self.history.is_near_end(last_position, previous.duration) {
                self.complete(&previous, previous.duration).await;
            } else if let Err(e) = self
                .history
                .save_or_reset(&previous, last_position, previous.duration)
                .await
            {
                warn!(error = %e, "Failed to save previous item position");
            }
        }

        let Some(next) = next else {
            return Ok(());
        };
        if let Some(identity) = next.identity() {
            if let Err(e) = self.queue.remove(&identity).await {
                warn!(error = %e, "Failed to remove native track from queue");
            }
        }

        self.selector.adopt_native_track(next.clone()).await?;
        self.chapters.clear();
        self.clip.arm(&next).await;
        self.last_clip = next.clip_id.is_some().then(|| next.clone());
        self.offer_native_next().await;
        Ok(())
    }

    /// End of the current item: complete it, then advance or stop
    async fn handle_track_ended(&mut self) -> Result<()> {
        let Some(current) = self.selector.now_playing().cloned() else {
            return Ok(());
        };
        let duration = self.selector.duration().await;

        self.clip.disarm();
        self.complete(&current, duration).await;
        self.selector.release_current();

        if let Some(next) = self.next_after_end(&current).await {
            match self.load_item(next, LoadOptions::default()).await {
                Ok(()) => return Ok(()),
                Err(e) => warn!(error = %e, "Failed to load next item after end"),
            }
        }

        info!("Nothing left to play");
        self.selector.finish().await
    }

    async fn complete(&self, item: &NowPlayingItem, duration: Option<f64>) {
        if let Err(e) = self.history.mark_completed(item, duration).await {
            warn!(error = %e, "Failed to mark item completed");
        }
        if let Some(episode_id) = item.episode_id.clone() {
            self.events.emit(PlayerEvent::EpisodeCompleted { episode_id });
        }
    }

    async fn next_after_end(&mut self, current: &NowPlayingItem) -> Option<NowPlayingItem> {
        match self.queue.dequeue_next().await {
            Ok(Some(next)) => return Some(next),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to advance queue"),
        }

        if !self
            .settings
            .auto_play_episodes_from_podcast()
            .await
            .unwrap_or(false)
        {
            return None;
        }
        let lookup = self.next_episode.as_ref()?;
        match lookup.next_episode(current).await {
            Ok(next) => next,
            Err(e) => {
                warn!(error = %e, "Next episode lookup failed");
                None
            }
        }
    }

    // ===== Remote control =====

    pub async fn handle_remote(&mut self, command: RemoteCommand) -> Result<()> {
        debug!(?command, "Remote command");
        match command {
            RemoteCommand::Play => self.play().await,
            RemoteCommand::Pause => self.pause().await,
            RemoteCommand::Stop => {
                if self.selector.state().is_playing() {
                    self.pause().await?;
                }
                self.events.emit(PlayerEvent::RemoteStop);
                Ok(())
            }
            RemoteCommand::Seek(position) => self.seek_to(position).await,
            RemoteCommand::JumpBackward => self.jump_backward(None).await,
            RemoteCommand::JumpForward => self.jump_forward(None).await,
            RemoteCommand::Next => self.next().await.map(|_| ()),
            RemoteCommand::Previous => self.previous().await,
            RemoteCommand::Duck { paused, permanent } => self.handle_duck(paused, permanent).await,
        }
    }

    async fn handle_duck(&mut self, paused: bool, permanent: bool) -> Result<()> {
        let playing = self.selector.state().is_playing();

        if permanent {
            self.was_paused_by_duck = false;
            if playing {
                self.pause().await?;
            }
            return Ok(());
        }

        if paused {
            if playing {
                self.pause().await?;
                self.was_paused_by_duck = true;
            }
            return Ok(());
        }

        if self.was_paused_by_duck {
            self.was_paused_by_duck = false;
            self.play().await?;
        }
        Ok(())
    }
}
