//! Background tasks that feed the scheduler from outside events

use crate::scheduler::DownloadScheduler;
use crate::types::SchedulerTrigger;
use async_trait::async_trait;
use podline_core::traits::ConnectivityProvider;
use podline_core::types::Connectivity;
use podline_playback::PlayerEvent;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Connectivity snapshot pushed by the host platform
///
/// Acts as the provider for everything that reads connectivity and as the
/// source of change notifications for [`spawn_connectivity_watcher`].
#[derive(Debug)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<Connectivity>,
}

impl ConnectivityMonitor {
    pub fn new(initial: Connectivity) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Publish a new snapshot; unchanged values do not notify
    pub fn set(&self, connectivity: Connectivity) {
        self.tx.send_if_modified(|current| {
            if *current == connectivity {
                return false;
            }
            *current = connectivity;
            true
        });
    }

    pub fn current(&self) -> Connectivity {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl ConnectivityProvider for ConnectivityMonitor {
    async fn connectivity(&self) -> Connectivity {
        self.current()
    }
}

/// Run a pass whenever the network goes from unusable to usable
pub fn spawn_connectivity_watcher(
    scheduler: DownloadScheduler,
    mut rx: watch::Receiver<Connectivity>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut was_valid = rx.borrow_and_update().is_valid();
        while rx.changed().await.is_ok() {
            let is_valid = rx.borrow_and_update().is_valid();
            let regained = is_valid && !was_valid;
            was_valid = is_valid;
            if !regained {
                continue;
            }

            info!("Connectivity regained, running download pass");
            if let Err(e) = scheduler.run(SchedulerTrigger::ConnectivityRegained).await {
                warn!(error = %e, "Download pass after reconnect failed");
            }
        }
        debug!("Connectivity watcher stopped");
    })
}

/// Delete finished episodes' downloads as completions are announced
pub fn spawn_completion_listener(
    scheduler: DownloadScheduler,
    mut events: broadcast::Receiver<PlayerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(PlayerEvent::EpisodeCompleted { episode_id }) => {
                    if let Err(e) = scheduler.handle_episode_completed(&episode_id).await {
                        warn!(episode_id = %episode_id, error = %e, "Auto-delete failed");
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Completion listener lagged behind player events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("Completion listener stopped");
    })
}
