//! History reconciliation
//!
//! [`HistoryService`] is the only writer of listening history. Local writes
//! go through [`HistoryStore`] under a lock and are awaited; the matching
//! server write is spawned afterwards and never awaited by the caller.
//!
//! Server writes are best effort. A failure is logged and dropped; the next
//! write for the same identity carries the newer position anyway. Each
//! spawned write is stamped with a per-identity sequence number. Sends for
//! one identity are serialized, and a write that has been overtaken by a
//! newer one is dropped before it is sent.

use crate::error::{PlaybackError, Result};
use crate::events::{EventBus, PlayerEvent};
use chrono::Utc;
use podline_core::network::has_valid_network_connection;
use podline_core::traits::{ConnectivityProvider, RemoteHistoryApi, SessionProvider};
use podline_core::types::{
    HistoryIndex, HistoryItem, NowPlayingItem, PlaybackIdentity, RemoteHistoryUpdate,
};
use podline_storage::{HistoryStore, SettingsStore};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

/// Items this close to their end (in seconds) are stored as completed
pub const COMPLETION_THRESHOLD_SECS: f64 = 10.0;

/// Options for [`HistoryService::record_position`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOptions {
    /// Move the record to the front with a fresh order date
    pub force_update_order_date: bool,
    /// Store as completed regardless of position
    pub completed: bool,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            force_update_order_date: true,
            completed: false,
        }
    }
}

impl RecordOptions {
    /// Update in place, keeping the existing order date
    pub fn in_place() -> Self {
        Self {
            force_update_order_date: false,
            completed: false,
        }
    }
}

/// Remote history API plus the session that authorizes it
#[derive(Clone)]
pub struct RemoteHistory {
    pub api: Arc<dyn RemoteHistoryApi>,
    pub session: Arc<dyn SessionProvider>,
}

/// Latest sequence stamp issued per identity, plus its send lock
///
/// An entry lives only while a write for that identity is pending.
#[derive(Default)]
struct SequenceLedger {
    next: AtomicU64,
    latest: StdMutex<HashMap<PlaybackIdentity, LedgerEntry>>,
}

struct LedgerEntry {
    stamp: u64,
    send: Arc<Mutex<()>>,
}

impl SequenceLedger {
    /// Issue a new stamp; returns it with the identity's send lock
    fn stamp(&self, identity: &PlaybackIdentity) -> (u64, Arc<Mutex<()>>) {
        let stamp = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        let Ok(mut latest) = self.latest.lock() else {
            return (stamp, Arc::new(Mutex::new(())));
        };
        let entry = latest
            .entry(identity.clone())
            .or_insert_with(|| LedgerEntry {
                stamp,
                send: Arc::new(Mutex::new(())),
            });
        entry.stamp = stamp;
        (stamp, entry.send.clone())
    }

    /// Whether `stamp` is still the newest issued for `identity`
    ///
    /// A settled identity has no entry, so any stamp still around for it is
    /// older than the one that settled.
    fn is_current(&self, identity: &PlaybackIdentity, stamp: u64) -> bool {
        let Ok(latest) = self.latest.lock() else {
            return true;
        };
        latest.get(identity).is_some_and(|entry| entry.stamp == stamp)
    }

    /// Drop the entry once the newest write for `identity` is done
    fn settle(&self, identity: &PlaybackIdentity, stamp: u64) {
        if let Ok(mut latest) = self.latest.lock() {
            if latest.get(identity).is_some_and(|entry| entry.stamp == stamp) {
                latest.remove(identity);
            }
        }
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.latest.lock().map_or(0, |latest| latest.len())
    }
}

/// Count of spawned server writes still running
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

struct InFlightGuard(Arc<InFlight>);

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(self.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

pub struct HistoryService {
    store: HistoryStore,
    settings: SettingsStore,
    connectivity: Arc<dyn ConnectivityProvider>,
    remote: Option<RemoteHistory>,
    events: EventBus,
    completion_threshold: f64,
    write_lock: Mutex<()>,
    ledger: Arc<SequenceLedger>,
    in_flight: Arc<InFlight>,
}

impl HistoryService {
    pub fn new(
        store: HistoryStore,
        settings: SettingsStore,
        connectivity: Arc<dyn ConnectivityProvider>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            settings,
            connectivity,
            remote: None,
            events,
            completion_threshold: COMPLETION_THRESHOLD_SECS,
            write_lock: Mutex::new(()),
            ledger: Arc::new(SequenceLedger::default()),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn with_remote(mut self, remote: RemoteHistory) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_completion_threshold(mut self, seconds: f64) -> Self {
        self.completion_threshold = seconds;
        self
    }

    pub fn completion_threshold(&self) -> f64 {
        self.completion_threshold
    }

    /// Whether `position` is close enough to `duration` to count as finished
    pub fn is_near_end(&self, position: f64, duration: Option<f64>) -> bool {
        duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .is_some_and(|d| position > 0.0 && position >= d - self.completion_threshold)
    }

    /// Upsert the listening position for `item`
    ///
    /// The local write is complete when this returns. The server write, if
    /// any, runs in the background.
    pub async fn record_position(
        &self,
        item: &NowPlayingItem,
        position: f64,
        duration: Option<f64>,
        options: RecordOptions,
    ) -> Result<HistoryItem> {
        let identity = item
            .identity()
            .ok_or_else(|| PlaybackError::InvalidItem("item has no identity".into()))?;

        let duration = duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(f64::floor);
        let mut position = if position.is_finite() {
            position.max(0.0).floor()
        } else {
            0.0
        };
        let completed = options.completed || self.is_near_end(position, duration);
        if completed {
            position = 0.0;
        }

        let mut snapshot = item.clone();
        snapshot.user_playback_position = position;
        if duration.is_some() {
            snapshot.duration = duration;
        }

        let record = {
            let _guard = self.write_lock.lock().await;
            let mut items = self.store.load().await?;
            let now = Utc::now();

            let record = match items.iter().position(|r| r.identity == identity) {
                Some(index) if !options.force_update_order_date => {
                    let existing = &mut items[index];
                    existing.item = Some(snapshot);
                    existing.user_playback_position = position;
                    existing.completed = completed;
                    existing.media_file_duration = duration.or(existing.media_file_duration);
                    existing.clone()
                }
                existing => {
                    let previous_duration =
                        existing.and_then(|i| items.remove(i).media_file_duration);
                    let record = HistoryItem {
                        identity: identity.clone(),
                        item: Some(snapshot),
                        media_file_duration: duration.or(previous_duration),
                        user_playback_position: position,
                        completed,
                        last_updated_at: now,
                    };
                    items.insert(0, record.clone());
                    record
                }
            };

            self.store.save(&items).await?;
            record
        };

        debug!(
            identity = %identity,
            position,
            completed,
            force = options.force_update_order_date,
            "History record saved"
        );
        self.events.emit(PlayerEvent::HistoryUpdated {
            identity: Some(identity.clone()),
        });

        self.spawn_remote_write(
            RemoteHistoryUpdate {
                identity,
                user_playback_position: position,
                media_file_duration: duration,
                force_update_order_date: options.force_update_order_date,
                completed,
            },
            item.source.is_external_feed(),
        );

        Ok(record)
    }

    /// Fire-and-forget [`record_position`](Self::record_position)
    pub fn record_position_detached(
        self: &Arc<Self>,
        item: NowPlayingItem,
        position: f64,
        duration: Option<f64>,
        options: RecordOptions,
    ) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = service
                .record_position(&item, position, duration, options)
                .await
            {
                warn!(error = %e, "Detached history write failed");
            }
        });
    }

    pub async fn mark_completed(
        &self,
        item: &NowPlayingItem,
        duration: Option<f64>,
    ) -> Result<HistoryItem> {
        self.record_position(
            item,
            0.0,
            duration,
            RecordOptions {
                force_update_order_date: true,
                completed: true,
            },
        )
        .await
    }

    /// Flush used on pause, backgrounding and backend switches
    ///
    /// Nothing is written for a position of zero or less. The record keeps
    /// its place in the history order.
    pub async fn save_or_reset(
        &self,
        item: &NowPlayingItem,
        position: f64,
        duration: Option<f64>,
    ) -> Result<Option<HistoryItem>> {
        if position <= 0.0 || !position.is_finite() {
            return Ok(None);
        }
        self.record_position(item, position, duration, RecordOptions::in_place())
            .await
            .map(Some)
    }

    /// Records, most recent first
    pub async fn items(&self) -> Result<Vec<HistoryItem>> {
        Ok(self.store.load().await?)
    }

    pub async fn get_index(&self) -> Result<HistoryIndex> {
        let items = self.store.load().await?;
        Ok(HistoryIndex::from_items(&items))
    }

    /// Merge the server's history into the local list
    ///
    /// Falls back to the local list when the server can't be reached.
    pub async fn sync_with_remote(&self) -> Result<HistoryIndex> {
        let Some(remote_items) = self.fetch_remote().await else {
            return self.get_index().await;
        };

        let merged = {
            let _guard = self.write_lock.lock().await;
            let local = self.store.load().await?;
            let merged = merge_history(local, remote_items);
            self.store.save(&merged).await?;
            merged
        };

        info!(count = merged.len(), "History synced with server");
        self.events
            .emit(PlayerEvent::HistoryUpdated { identity: None });
        Ok(HistoryIndex::from_items(&merged))
    }

    /// Wipe local history and, best effort, the server's copy
    pub async fn clear_all(&self) -> Result<()> {
        {
            let _guard = self.write_lock.lock().await;
            self.store.clear().await?;
        }
        info!("Local history cleared");
        self.events
            .emit(PlayerEvent::HistoryUpdated { identity: None });

        if let Some(remote) = self.usable_remote().await {
            if let Err(e) = remote.api.remove_all_history_items().await {
                warn!(error = %e, "Failed to clear server history");
            }
        }
        Ok(())
    }

    /// Remove one record; returns whether it existed locally
    pub async fn remove(&self, identity: &PlaybackIdentity) -> Result<bool> {
        let removed = {
            let _guard = self.write_lock.lock().await;
            let mut items = self.store.load().await?;
            let before = items.len();
            items.retain(|r| &r.identity != identity);
            let removed = items.len() != before;
            if removed {
                self.store.save(&items).await?;
            }
            removed
        };

        if removed {
            self.events.emit(PlayerEvent::HistoryUpdated {
                identity: Some(identity.clone()),
            });
        }

        if let Some(remote) = self.usable_remote().await {
            if let Err(e) = remote.api.remove_history_item(identity).await {
                warn!(identity = %identity, error = %e, "Failed to remove server history item");
            }
        }
        Ok(removed)
    }

    /// Wait until every spawned server write has finished
    pub async fn remote_writes_idle(&self) {
        loop {
            let notified = self.in_flight.idle.notified();
            if self.in_flight.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    async fn fetch_remote(&self) -> Option<Vec<HistoryItem>> {
        let remote = self.usable_remote().await?;
        match remote.api.fetch_history_items().await {
            Ok(items) => Some(items),
            Err(e) => {
                warn!(error = %e, "Failed to fetch server history, using local only");
                None
            }
        }
    }

    /// The remote, if configured, signed in and reachable
    async fn usable_remote(&self) -> Option<&RemoteHistory> {
        let remote = self.remote.as_ref()?;
        if !remote.session.is_authenticated().await {
            debug!("Not signed in, skipping server history");
            return None;
        }
        let offline = self.settings.offline_mode().await.unwrap_or(false);
        if !has_valid_network_connection(self.connectivity.as_ref(), offline).await {
            debug!("No valid connection, skipping server history");
            return None;
        }
        Some(remote)
    }

    fn spawn_remote_write(&self, update: RemoteHistoryUpdate, is_external_feed: bool) {
        let Some(remote) = self.remote.clone() else {
            return;
        };
        if is_external_feed {
            debug!(identity = %update.identity, "External feed item, not sent to server");
            return;
        }

        let (stamp, send_lock) = self.ledger.stamp(&update.identity);
        let ledger = self.ledger.clone();
        let settings = self.settings.clone();
        let connectivity = self.connectivity.clone();
        let guard = self.in_flight.enter();

        tokio::spawn(async move {
            let _guard = guard;
            let identity = update.identity.clone();
            send_remote_write(
                &remote,
                &settings,
                connectivity.as_ref(),
                &ledger,
                &send_lock,
                &update,
                stamp,
            )
            .await;
            ledger.settle(&identity, stamp);
        });
    }
}

async fn send_remote_write(
    remote: &RemoteHistory,
    settings: &SettingsStore,
    connectivity: &dyn ConnectivityProvider,
    ledger: &SequenceLedger,
    send_lock: &Mutex<()>,
    update: &RemoteHistoryUpdate,
    stamp: u64,
) {
    if !remote.session.is_authenticated().await {
        return;
    }
    let offline = settings.offline_mode().await.unwrap_or(false);
    if !has_valid_network_connection(connectivity, offline).await {
        debug!(identity = %update.identity, "No valid connection, server write skipped");
        return;
    }

    let _send = send_lock.lock().await;
    if !ledger.is_current(&update.identity, stamp) {
        debug!(identity = %update.identity, stamp, "Superseded server write dropped");
        return;
    }
    match remote.api.upsert_history_item(update).await {
        Ok(()) => debug!(identity = %update.identity, "Server history updated"),
        Err(e) => warn!(identity = %update.identity, error = %e, "Server history write dropped"),
    }
}

/// Union by identity; local records win, newest first
///
/// The sort is stable, so records with equal order dates keep local-first
/// order.
pub fn merge_history(local: Vec<HistoryItem>, remote: Vec<HistoryItem>) -> Vec<HistoryItem> {
    let mut seen: HashSet<PlaybackIdentity> = HashSet::with_capacity(local.len() + remote.len());
    let mut merged = Vec::with_capacity(local.len() + remote.len());

    for record in local.into_iter().chain(remote) {
        if seen.insert(record.identity.clone()) {
            merged.push(record);
        }
    }

    merged.sort_by(|a, b| b.last_updated_at.cmp(&a.last_updated_at));
    merged
}
