//! Shared test infrastructure for the player integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use podline_core::network::StaticConnectivity;
use podline_core::traits::{
    ConnectivityProvider, NextEpisodeLookup, RemoteHistoryApi, SessionProvider,
};
use podline_core::types::{
    ClipId, Connectivity, EpisodeId, HistoryItem, MediaType, NowPlayingItem, PlaybackIdentity,
    PodcastSource, RemoteHistoryUpdate,
};
use podline_core::{KeyValueStore, PodError, Result};
use podline_playback::{
    spawn_player, EngineEventSink, EngineKind, NativePlayer, PlayerChannel, PlayerConfig,
    PlayerDeps, PlayerHandle, PlayerManager, PlayerState,
};
use podline_storage::{HistoryStore, MemoryKeyValueStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

// ============================================================================
// Items
// ============================================================================

pub fn episode(id: &str) -> NowPlayingItem {
    NowPlayingItem::episode(
        EpisodeId::new(id),
        PodcastSource::catalog("pod-1"),
        format!("https://cdn.example.com/{}.mp3", id),
        MediaType::Audio,
    )
}

pub fn video_episode(id: &str) -> NowPlayingItem {
    NowPlayingItem::episode(
        EpisodeId::new(id),
        PodcastSource::catalog("pod-1"),
        format!("https://cdn.example.com/{}.mp4", id),
        MediaType::Video,
    )
}

pub fn external_episode(id: &str) -> NowPlayingItem {
    NowPlayingItem::episode(
        EpisodeId::new(id),
        PodcastSource::external_feed("https://feeds.example.org/show.xml"),
        format!("https://feeds.example.org/{}.mp3", id),
        MediaType::Audio,
    )
}

pub fn clip(clip_id: &str, episode_id: &str, start: f64, end: Option<f64>) -> NowPlayingItem {
    NowPlayingItem::clip(
        ClipId::new(clip_id),
        Some(EpisodeId::new(episode_id)),
        PodcastSource::catalog("pod-1"),
        format!("https://cdn.example.com/{}.mp3", episode_id),
        MediaType::Audio,
        start,
        end,
    )
}

pub fn episode_identity(id: &str) -> PlaybackIdentity {
    PlaybackIdentity::Episode(EpisodeId::new(id))
}

pub fn clip_identity(id: &str) -> PlaybackIdentity {
    PlaybackIdentity::Clip(ClipId::new(id))
}

// ============================================================================
// Fake native player
// ============================================================================

#[derive(Default)]
struct FakeState {
    loaded: Option<NowPlayingItem>,
    position: f64,
    duration: Option<f64>,
    rate: f64,
    state: PlayerState,
    fail_next_load: bool,
    queued_next: Option<NowPlayingItem>,
    calls: Vec<String>,
    history_at_load: Vec<Vec<HistoryItem>>,
}

/// In-memory stand-in for an OS media player
///
/// The position only moves when a test sets it or seeks.
pub struct FakePlayer {
    state: Mutex<FakeState>,
    history_probe: Option<HistoryStore>,
}

impl FakePlayer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                rate: 1.0,
                ..FakeState::default()
            }),
            history_probe: None,
        }
    }

    /// Snapshot the stored history each time `load` is called
    pub fn with_history_probe(mut self, kv: Arc<dyn KeyValueStore>) -> Self {
        self.history_probe = Some(HistoryStore::new(kv));
        self
    }

    pub fn set_position(&self, position: f64) {
        self.state.lock().unwrap().position = position;
    }

    pub fn set_duration(&self, duration: f64) {
        self.state.lock().unwrap().duration = Some(duration);
    }

    pub fn fail_next_load(&self) {
        self.state.lock().unwrap().fail_next_load = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn loaded(&self) -> Option<NowPlayingItem> {
        self.state.lock().unwrap().loaded.clone()
    }

    pub fn queued_next(&self) -> Option<NowPlayingItem> {
        self.state.lock().unwrap().queued_next.clone()
    }

    pub fn current_rate(&self) -> f64 {
        self.state.lock().unwrap().rate
    }

    pub fn native_state(&self) -> PlayerState {
        self.state.lock().unwrap().state
    }

    pub fn history_at_load(&self) -> Vec<Vec<HistoryItem>> {
        self.state.lock().unwrap().history_at_load.clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.state.lock().unwrap().calls.push(call.into());
    }
}

#[async_trait]
impl NativePlayer for FakePlayer {
    async fn load(&self, item: &NowPlayingItem, start_position: f64, should_play: bool) -> Result<()> {
        if let Some(probe) = &self.history_probe {
            let snapshot = probe.load().await?;
            self.state.lock().unwrap().history_at_load.push(snapshot);
        }

        let mut state = self.state.lock().unwrap();
        let identity = item.identity().map(|i| i.to_string()).unwrap_or_default();
        state.calls.push(format!("load:{}", identity));
        if state.fail_next_load {
            state.fail_next_load = false;
            return Err(PodError::engine("media could not be opened"));
        }
        state.loaded = Some(item.clone());
        state.position = start_position;
        state.duration = item.duration;
        state.state = if should_play {
            PlayerState::Playing
        } else {
            PlayerState::Ready
        };
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.record("play");
        self.state.lock().unwrap().state = PlayerState::Playing;
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.record("pause");
        self.state.lock().unwrap().state = PlayerState::Paused;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.record("stop");
        let mut state = self.state.lock().unwrap();
        state.loaded = None;
        state.state = PlayerState::Idle;
        Ok(())
    }

    async fn seek_to(&self, position: f64) -> Result<()> {
        self.record(format!("seek:{}", position));
        self.state.lock().unwrap().position = position;
        Ok(())
    }

    async fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    async fn duration(&self) -> Option<f64> {
        self.state.lock().unwrap().duration
    }

    async fn rate(&self) -> f64 {
        self.state.lock().unwrap().rate
    }

    async fn set_rate(&self, rate: f64) -> Result<()> {
        self.record(format!("rate:{}", rate));
        self.state.lock().unwrap().rate = rate;
        Ok(())
    }

    async fn state(&self) -> PlayerState {
        self.state.lock().unwrap().state
    }

    async fn enqueue_next(&self, item: &NowPlayingItem) -> Result<()> {
        self.state.lock().unwrap().queued_next = Some(item.clone());
        Ok(())
    }
}

// ============================================================================
// Fake server side
// ============================================================================

/// Records every server write; can be told to fail
#[derive(Default)]
pub struct RecordingRemote {
    pub upserts: Mutex<Vec<RemoteHistoryUpdate>>,
    pub fetched: Mutex<Vec<HistoryItem>>,
    pub removed: Mutex<Vec<PlaybackIdentity>>,
    pub cleared: AtomicBool,
    pub fail: AtomicBool,
}

impl RecordingRemote {
    pub fn failing() -> Self {
        let remote = Self::default();
        remote.fail.store(true, Ordering::SeqCst);
        remote
    }

    pub fn upserts(&self) -> Vec<RemoteHistoryUpdate> {
        self.upserts.lock().unwrap().clone()
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PodError::network("connection reset"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteHistoryApi for RecordingRemote {
    async fn upsert_history_item(&self, update: &RemoteHistoryUpdate) -> Result<()> {
        self.upserts.lock().unwrap().push(update.clone());
        self.check()
    }

    async fn fetch_history_items(&self) -> Result<Vec<HistoryItem>> {
        self.check()?;
        Ok(self.fetched.lock().unwrap().clone())
    }

    async fn remove_all_history_items(&self) -> Result<()> {
        self.check()?;
        self.cleared.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn remove_history_item(&self, identity: &PlaybackIdentity) -> Result<()> {
        self.check()?;
        self.removed.lock().unwrap().push(identity.clone());
        Ok(())
    }
}

pub struct FakeSession {
    pub authenticated: bool,
}

#[async_trait]
impl SessionProvider for FakeSession {
    async fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn bearer_token(&self) -> Option<String> {
        self.authenticated.then(|| "test-token".to_string())
    }
}

pub fn signed_in() -> Arc<dyn SessionProvider> {
    Arc::new(FakeSession {
        authenticated: true,
    })
}

pub fn wifi() -> Arc<dyn ConnectivityProvider> {
    Arc::new(StaticConnectivity(Connectivity::wifi()))
}

pub fn offline() -> Arc<dyn ConnectivityProvider> {
    Arc::new(StaticConnectivity(Connectivity::offline()))
}

// ============================================================================
// Player harness
// ============================================================================

/// A running player wired to fake backends
pub struct Harness {
    pub player: PlayerHandle,
    pub task: JoinHandle<PlayerManager>,
    pub audio: Arc<FakePlayer>,
    pub video: Arc<FakePlayer>,
    pub audio_events: EngineEventSink,
    pub video_events: EngineEventSink,
    pub kv: Arc<dyn KeyValueStore>,
    pub history: Arc<podline_playback::HistoryService>,
    pub events: podline_playback::EventBus,
}

pub struct HarnessBuilder {
    kv: Arc<dyn KeyValueStore>,
    audio: Option<FakePlayer>,
    remote: Option<(Arc<dyn RemoteHistoryApi>, Arc<dyn SessionProvider>)>,
    connectivity: Arc<dyn ConnectivityProvider>,
    next_episode: Option<Arc<dyn NextEpisodeLookup>>,
    config: PlayerConfig,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            kv: Arc::new(MemoryKeyValueStore::new()),
            audio: None,
            remote: None,
            connectivity: wifi(),
            next_episode: None,
            config: PlayerConfig::default(),
        }
    }

    pub fn kv(mut self, kv: Arc<dyn KeyValueStore>) -> Self {
        self.kv = kv;
        self
    }

    pub fn audio(mut self, audio: FakePlayer) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn remote(mut self, api: Arc<dyn RemoteHistoryApi>, session: Arc<dyn SessionProvider>) -> Self {
        self.remote = Some((api, session));
        self
    }

    pub fn connectivity(mut self, connectivity: Arc<dyn ConnectivityProvider>) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn next_episode(mut self, lookup: Arc<dyn NextEpisodeLookup>) -> Self {
        self.next_episode = Some(lookup);
        self
    }

    pub fn config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn start(self) -> Harness {
        let audio = Arc::new(self.audio.unwrap_or_else(FakePlayer::new));
        let video = Arc::new(FakePlayer::new());

        let channel = PlayerChannel::new();
        let audio_events = channel.engine_sink(EngineKind::Audio);
        let video_events = channel.engine_sink(EngineKind::Video);

        let mut deps = PlayerDeps::new(
            audio.clone(),
            video.clone(),
            self.kv.clone(),
            self.connectivity,
        )
        .with_config(self.config);
        if let Some((api, session)) = self.remote {
            deps = deps.with_remote(api, session);
        }
        if let Some(lookup) = self.next_episode {
            deps = deps.with_next_episode(lookup);
        }

        let manager = PlayerManager::new(deps, &channel).await.unwrap();
        let history = manager.history().clone();
        let events = manager.events();
        let (player, task) = spawn_player(manager, channel);

        Harness {
            player,
            task,
            audio,
            video,
            audio_events,
            video_events,
            kv: self.kv,
            history,
            events,
        }
    }
}

impl Harness {
    pub async fn start() -> Self {
        HarnessBuilder::new().start().await
    }

    pub async fn stored_history(&self) -> Vec<HistoryItem> {
        HistoryStore::new(self.kv.clone()).load().await.unwrap()
    }

    /// Round-trip through the dispatcher so earlier messages are handled
    pub async fn settle(&self) {
        self.player.state().await.unwrap();
    }
}
