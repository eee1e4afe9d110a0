//! Clip boundary enforcement
//!
//! While a clip with an end time is loaded, a ticker posts a
//! [`PlayerMessage::ClipTick`] to the dispatcher every
//! [`CLIP_CHECK_INTERVAL`]. The dispatcher runs [`ClipBoundaryController::check`]
//! with the current position, so ticks are serialized with engine events and
//! user commands.
//!
//! Every `arm` starts a new session. Ticks carry the session they were
//! started for and ticks from an older session are dropped.
//!
//! The controller only holds a weak sender, so it never keeps the
//! dispatcher alive on its own.

use crate::dispatcher::PlayerMessage;
use crate::task::SupersedingTask;
use podline_core::types::{ClipId, EpisodeId, NowPlayingItem};
use podline_storage::NowPlayingStore;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// How often the clip end is checked
pub const CLIP_CHECK_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
struct ArmedClip {
    session: u64,
    clip_id: ClipId,
    episode_id: Option<EpisodeId>,
    end_time: f64,
}

/// Outcome of a boundary check
#[derive(Debug, Clone, PartialEq)]
pub enum ClipCheck {
    /// Nothing armed, or the end was already handled
    Inactive,
    /// Still inside the clip
    Within,
    /// Crossed the end just now; handled exactly once per session
    Crossed {
        session: u64,
        clip_id: ClipId,
        episode_id: Option<EpisodeId>,
    },
}

pub struct ClipBoundaryController {
    session: u64,
    armed: Option<ArmedClip>,
    has_ended: bool,
    ticker: SupersedingTask,
    store: NowPlayingStore,
    tx: mpsc::WeakUnboundedSender<PlayerMessage>,
    interval: Duration,
}

impl ClipBoundaryController {
    pub fn new(
        store: NowPlayingStore,
        tx: mpsc::WeakUnboundedSender<PlayerMessage>,
        interval: Duration,
    ) -> Self {
        Self {
            session: 0,
            armed: None,
            has_ended: false,
            ticker: SupersedingTask::new(),
            store,
            tx,
            interval,
        }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn has_ended(&self) -> bool {
        self.has_ended
    }

    /// Start a new session for `item`
    ///
    /// Called on every load. Clears the ended flag; only clips with an end
    /// time get a ticker.
    pub async fn arm(&mut self, item: &NowPlayingItem) {
        self.session += 1;
        self.has_ended = false;
        if let Err(e) = self.store.set_clip_has_ended(false).await {
            warn!(error = %e, "Failed to reset clip ended flag");
        }

        let (Some(clip_id), Some(end_time)) = (item.clip_id.clone(), item.clip_end_time) else {
            self.armed = None;
            self.ticker.cancel();
            return;
        };

        debug!(session = self.session, clip_id = %clip_id, end_time, "Clip armed");
        self.armed = Some(ArmedClip {
            session: self.session,
            clip_id,
            episode_id: item.episode_id.clone(),
            end_time,
        });

        let session = self.session;
        let tx = self.tx.clone();
        let interval = self.interval;
        self.ticker.replace(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(tx) = tx.upgrade() else {
                    break;
                };
                if tx.send(PlayerMessage::ClipTick { session }).is_err() {
                    break;
                }
            }
        });
    }

    /// Stop watching; the ended flag is left as is
    pub fn disarm(&mut self) {
        if self.armed.take().is_some() {
            debug!(session = self.session, "Clip disarmed");
        }
        self.ticker.cancel();
    }

    /// Whether a tick stamped with `session` should be acted on
    pub fn accepts_tick(&self, session: u64) -> bool {
        self.armed.as_ref().is_some_and(|a| a.session == session)
    }

    /// Compare `position` against the armed clip's end
    ///
    /// On the first crossing the ended flag is set before anything else,
    /// then persisted, and the ticker is stopped.
    pub async fn check(&mut self, position: f64) -> ClipCheck {
        let Some(armed) = self.armed.as_ref() else {
            return ClipCheck::Inactive;
        };
        if self.has_ended {
            return ClipCheck::Inactive;
        }
        if position < armed.end_time {
            return ClipCheck::Within;
        }

        self.has_ended = true;
        let crossed = ClipCheck::Crossed {
            session: armed.session,
            clip_id: armed.clip_id.clone(),
            episode_id: armed.episode_id.clone(),
        };
        info!(session = armed.session, clip_id = %armed.clip_id, position, "Clip end reached");

        self.ticker.cancel();
        if let Err(e) = self.store.set_clip_has_ended(true).await {
            warn!(error = %e, "Failed to persist clip ended flag");
        }
        crossed
    }

    /// Queue the follow-up handoff for `session` on the dispatcher
    pub fn request_handoff(&self, session: u64) {
        let sent = self
            .tx
            .upgrade()
            .is_some_and(|tx| tx.send(PlayerMessage::ClipEnded { session }).is_ok());
        if !sent {
            warn!(session, "Player dispatcher gone, clip handoff dropped");
        }
    }
}
