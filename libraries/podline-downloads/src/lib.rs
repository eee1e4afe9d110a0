//! Podline Downloads
//!
//! Network-aware auto-download scheduling for subscribed podcasts.
//!
//! A pass asks the catalog for episodes published since the last refresh,
//! downloads the ones that are not already present, and evicts the oldest
//! downloads of any podcast that goes over its episode limit. Passes never
//! overlap; triggers that arrive mid-pass are folded into one follow-up pass.
//!
//! # Example
//!
//! ```rust,no_run
//! use podline_downloads::{ConnectivityMonitor, DownloadScheduler, SchedulerTrigger};
//! # use podline_core::{Connectivity, EpisodeCatalog, KeyValueStore, MediaDownloader};
//! # use podline_storage::{DownloadStore, SettingsStore};
//! # use std::sync::Arc;
//! # async fn example(
//! #     kv: Arc<dyn KeyValueStore>,
//! #     catalog: Arc<dyn EpisodeCatalog>,
//! #     downloader: Arc<dyn MediaDownloader>,
//! # ) -> podline_downloads::Result<()> {
//! let monitor = Arc::new(ConnectivityMonitor::new(Connectivity::wifi()));
//! let scheduler = DownloadScheduler::new(
//!     DownloadStore::new(kv.clone()),
//!     SettingsStore::new(kv),
//!     monitor.clone(),
//!     catalog,
//!     downloader,
//! );
//!
//! podline_downloads::spawn_connectivity_watcher(scheduler.clone(), monitor.subscribe());
//! scheduler.run(SchedulerTrigger::AppForeground).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod listener;
mod scheduler;
mod types;

pub use error::{DownloadError, Result};
pub use listener::{spawn_completion_listener, spawn_connectivity_watcher, ConnectivityMonitor};
pub use scheduler::DownloadScheduler;
pub use types::{
    BlockedReason, DownloadOutcome, PassSkip, PassSummary, SchedulerRun, SchedulerTrigger,
};
