//! Playback engines
//!
//! [`PlaybackEngine`] is the one transport contract the selector talks to.
//! [`AudioEngine`] and [`VideoEngine`] adapt a [`NativePlayer`] to it and
//! carry the per-backend differences.

use crate::native::NativePlayer;
use crate::types::PlayerState;
use async_trait::async_trait;
use podline_core::types::NowPlayingItem;
use podline_core::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Highest rate the video backend plays at
pub const MAX_VIDEO_RATE: f64 = 2.0;

/// Which backend plays an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Audio,
    Video,
}

impl EngineKind {
    /// Video and live video go to the video backend, everything else to audio
    pub fn for_item(item: &NowPlayingItem) -> Self {
        if item.classify().is_video {
            Self::Video
        } else {
            Self::Audio
        }
    }
}

/// Parameters for [`PlaybackEngine::load`]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineLoad {
    pub start_position: f64,
    pub should_play: bool,
    pub queue_next: Option<NowPlayingItem>,
}

#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    fn kind(&self) -> EngineKind;

    async fn load(&self, item: &NowPlayingItem, load: &EngineLoad) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    async fn seek_to(&self, position: f64) -> Result<()>;

    async fn position(&self) -> f64;

    async fn duration(&self) -> Option<f64>;

    async fn rate(&self) -> f64;

    /// Set the rate; returns the rate actually applied
    async fn set_rate(&self, rate: f64) -> Result<f64>;

    async fn state(&self) -> PlayerState;

    /// Offer the next item to the backend's native queue
    async fn enqueue_next(&self, item: &NowPlayingItem) -> Result<()>;
}

/// Audio backend, with a native queue for gapless hand-off
pub struct AudioEngine {
    native: Arc<dyn NativePlayer>,
}

impl AudioEngine {
    pub fn new(native: Arc<dyn NativePlayer>) -> Self {
        Self { native }
    }
}

#[async_trait]
impl PlaybackEngine for AudioEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Audio
    }

    async fn load(&self, item: &NowPlayingItem, load: &EngineLoad) -> Result<()> {
        self.native
            .load(item, load.start_position, load.should_play)
            .await?;
        if let Some(next) = &load.queue_next {
            self.native.enqueue_next(next).await?;
        }
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.native.play().await
    }

    async fn pause(&self) -> Result<()> {
        self.native.pause().await
    }

    async fn stop(&self) -> Result<()> {
        self.native.stop().await
    }

    async fn seek_to(&self, position: f64) -> Result<()> {
        self.native.seek_to(position).await
    }

    async fn position(&self) -> f64 {
        self.native.position().await
    }

    async fn duration(&self) -> Option<f64> {
        self.native.duration().await
    }

    async fn rate(&self) -> f64 {
        self.native.rate().await
    }

    async fn set_rate(&self, rate: f64) -> Result<f64> {
        self.native.set_rate(rate).await?;
        Ok(rate)
    }

    async fn state(&self) -> PlayerState {
        self.native.state().await
    }

    async fn enqueue_next(&self, item: &NowPlayingItem) -> Result<()> {
        self.native.enqueue_next(item).await
    }
}

/// Video backend; no native queue and a capped rate
pub struct VideoEngine {
    native: Arc<dyn NativePlayer>,
}

impl VideoEngine {
    pub fn new(native: Arc<dyn NativePlayer>) -> Self {
        Self { native }
    }
}

#[async_trait]
impl PlaybackEngine for VideoEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Video
    }

    async fn load(&self, item: &NowPlayingItem, load: &EngineLoad) -> Result<()> {
        if load.queue_next.is_some() {
            debug!("Video backend has no native queue, ignoring queue-next item");
        }
        self.native
            .load(item, load.start_position, load.should_play)
            .await
    }

    async fn play(&self) -> Result<()> {
        self.native.play().await
    }

    async fn pause(&self) -> Result<()> {
        self.native.pause().await
    }

    async fn stop(&self) -> Result<()> {
        self.native.stop().await
    }

    async fn seek_to(&self, position: f64) -> Result<()> {
        self.native.seek_to(position).await
    }

    async fn position(&self) -> f64 {
        self.native.position().await
    }

    async fn duration(&self) -> Option<f64> {
        self.native.duration().await
    }

    async fn rate(&self) -> f64 {
        self.native.rate().await
    }

    async fn set_rate(&self, rate: f64) -> Result<f64> {
        let applied = rate.min(MAX_VIDEO_RATE);
        self.native.set_rate(applied).await?;
        Ok(applied)
    }

    async fn state(&self) -> PlayerState {
        self.native.state().await
    }

    async fn enqueue_next(&self, _item: &NowPlayingItem) -> Result<()> {
        Ok(())
    }
}
