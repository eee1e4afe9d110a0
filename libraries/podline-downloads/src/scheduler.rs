use crate::error::{DownloadError, Result};
use crate::types::{
    BlockedReason, DownloadOutcome, PassSkip, PassSummary, SchedulerRun, SchedulerTrigger,
};
use chrono::Utc;
use podline_core::network::{has_valid_network_connection, resolve_connectivity};
use podline_core::traits::{ConnectivityProvider, EpisodeCatalog, MediaDownloader};
use podline_core::types::{CatalogEpisode, DownloadRecord, DownloadState, EpisodeId};
use podline_storage::{DownloadStore, SettingsStore};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Fetches new episodes of auto-download podcasts and enforces per-podcast
/// limits
///
/// Cheap to clone; clones share the one-pass-at-a-time latch.
#[derive(Clone)]
pub struct DownloadScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    store: DownloadStore,
    settings: SettingsStore,
    connectivity: Arc<dyn ConnectivityProvider>,
    catalog: Arc<dyn EpisodeCatalog>,
    downloader: Arc<dyn MediaDownloader>,
    running: AtomicBool,
    rerun: AtomicBool,
}

/// Held for a whole pass; dropping it reopens the latch even on error
struct PassLatch<'a>(&'a AtomicBool);

impl<'a> PassLatch<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PassLatch<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl DownloadScheduler {
    pub fn new(
        store: DownloadStore,
        settings: SettingsStore,
        connectivity: Arc<dyn ConnectivityProvider>,
        catalog: Arc<dyn EpisodeCatalog>,
        downloader: Arc<dyn MediaDownloader>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                settings,
                connectivity,
                catalog,
                downloader,
                running: AtomicBool::new(false),
                rerun: AtomicBool::new(false),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Run an auto-download pass
    ///
    /// If a pass is already running the trigger is folded into it: the
    /// running owner makes one more pass when its current one finishes, and
    /// this call returns [`SchedulerRun::Coalesced`] right away. Any number
    /// of triggers arriving during one pass collapse into a single rerun.
    pub async fn run(&self, trigger: SchedulerTrigger) -> Result<SchedulerRun> {
        let inner = &self.inner;
        inner.rerun.store(true, Ordering::SeqCst);

        let mut passes = Vec::new();
        loop {
            let Some(latch) = PassLatch::acquire(&inner.running) else {
                if passes.is_empty() {
                    debug!(?trigger, "Download pass in flight, coalescing trigger");
                    return Ok(SchedulerRun::Coalesced);
                }
                // Another caller took the latch and owns the pending rerun
                break;
            };

            while inner.rerun.swap(false, Ordering::SeqCst) {
                if !passes.is_empty() {
                    debug!(?trigger, "Running coalesced download pass");
                }
                passes.push(self.pass(trigger).await?);
            }
            drop(latch);

            // A trigger may have landed between the last check and the release
            if !inner.rerun.load(Ordering::SeqCst) {
                break;
            }
        }
        Ok(SchedulerRun::Completed(passes))
    }

    async fn pass(&self, trigger: SchedulerTrigger) -> Result<PassSummary> {
        let started_at = Utc::now();
        let mut summary = PassSummary::new(Uuid::new_v4().to_string(), trigger, started_at);
        let inner = &self.inner;

        let since = inner.store.last_refreshed().await?.unwrap_or(started_at);
        let podcasts = inner.store.auto_download_podcasts().await?;
        if podcasts.is_empty() {
            debug!(run_id = %summary.run_id, "No auto-download podcasts");
            summary.skipped = Some(PassSkip::NoPodcasts);
            return Ok(summary);
        }

        let offline = inner.settings.offline_mode().await?;
        if !has_valid_network_connection(inner.connectivity.as_ref(), offline).await {
            debug!(run_id = %summary.run_id, "No valid connection, skipping download pass");
            summary.skipped = Some(PassSkip::NoConnection);
            return Ok(summary);
        }

        info!(
            run_id = %summary.run_id,
            ?trigger,
            podcasts = podcasts.len(),
            since = %since,
            "Starting download pass"
        );

        let episodes = inner
            .catalog
            .episodes_since(since, &podcasts)
            .await
            .map_err(|e| DownloadError::Catalog(e.to_string()))?;

        let wifi_only = inner.settings.downloading_wifi_only().await?;
        let on_wifi = resolve_connectivity(inner.connectivity.as_ref())
            .await
            .is_wifi();

        for episode in &episodes {
            summary.episodes_checked += 1;

            let present = inner
                .store
                .record(&episode.episode_id)
                .await?
                .is_some_and(|r| r.is_present());
            if present {
                summary.already_present += 1;
                continue;
            }

            if wifi_only && !on_wifi {
                debug!(episode_id = %episode.episode_id, "Not on wifi, deferring download");
                summary.deferred_wifi_only += 1;
                continue;
            }

            match self.fetch(episode).await {
                Ok((_, evicted)) => {
                    summary.downloaded += 1;
                    summary.evicted += evicted;
                }
                Err(e) => {
                    error!(episode_id = %episode.episode_id, error = %e, "Auto-download failed");
                    summary.failed += 1;
                }
            }
        }

        if summary.deferred_wifi_only == 0 {
            inner.store.set_last_refreshed(started_at).await?;
            summary.refreshed = true;
        }

        info!(
            run_id = %summary.run_id,
            checked = summary.episodes_checked,
            downloaded = summary.downloaded,
            already_present = summary.already_present,
            deferred = summary.deferred_wifi_only,
            failed = summary.failed,
            evicted = summary.evicted,
            "Download pass complete"
        );
        Ok(summary)
    }

    /// Download one episode the user asked for
    pub async fn request_download(&self, episode: &CatalogEpisode) -> Result<DownloadOutcome> {
        let inner = &self.inner;
        let present = inner
            .store
            .record(&episode.episode_id)
            .await?
            .is_some_and(|r| r.is_present());
        if present {
            return Ok(DownloadOutcome::AlreadyPresent);
        }

        if let Some(reason) = self.blocked_reason().await? {
            info!(episode_id = %episode.episode_id, ?reason, "Download blocked");
            return Ok(DownloadOutcome::Blocked(reason));
        }

        let (path, _) = self.fetch(episode).await?;
        Ok(DownloadOutcome::Completed(path))
    }

    async fn blocked_reason(&self) -> Result<Option<BlockedReason>> {
        let inner = &self.inner;
        if inner.settings.offline_mode().await? {
            return Ok(Some(BlockedReason::OfflineMode));
        }
        let connectivity = resolve_connectivity(inner.connectivity.as_ref()).await;
        if !connectivity.is_valid() {
            return Ok(Some(BlockedReason::NoConnection));
        }
        if inner.settings.downloading_wifi_only().await? && !connectivity.is_wifi() {
            return Ok(Some(BlockedReason::WifiOnly));
        }
        Ok(None)
    }

    /// Download, record it and enforce the podcast's limit
    ///
    /// Returns the file path and how many older episodes were evicted.
    async fn fetch(&self, episode: &CatalogEpisode) -> Result<(PathBuf, usize)> {
        let inner = &self.inner;
        let mut record = DownloadRecord::downloading(episode);
        inner.store.upsert_record(record.clone()).await?;

        info!(episode_id = %episode.episode_id, podcast = %record.podcast_key, "Downloading episode");
        let path = match inner.downloader.download(episode).await {
            Ok(path) => path,
            Err(e) => {
                if let Err(remove_err) = inner.store.remove_record(&episode.episode_id).await {
                    warn!(episode_id = %episode.episode_id, error = %remove_err, "Failed to clear download record");
                }
                return Err(DownloadError::Failed {
                    episode_id: episode.episode_id.clone(),
                    message: e.to_string(),
                });
            }
        };

        record.is_downloading = false;
        record.is_downloaded = true;
        record.downloaded_at = Some(Utc::now());
        record.file_path = Some(path.clone());
        inner.store.upsert_record(record.clone()).await?;
        info!(episode_id = %episode.episode_id, path = %path.display(), "Episode downloaded");

        let evicted = self.evict(&record.podcast_key).await?;
        Ok((path, evicted))
    }

    /// Delete the oldest downloads of a podcast beyond its limit
    ///
    /// Oldest is by publish date; a missing date sorts first.
    async fn evict(&self, podcast_key: &str) -> Result<usize> {
        let inner = &self.inner;
        let limit = inner.store.episode_limit(podcast_key).await? as usize;
        if limit == 0 {
            return Ok(0);
        }

        let mut downloaded: Vec<DownloadRecord> = inner
            .store
            .records()
            .await?
            .into_values()
            .filter(|r| r.podcast_key == podcast_key && r.is_downloaded)
            .collect();
        if downloaded.len() <= limit {
            return Ok(0);
        }

        downloaded.sort_by(|a, b| a.pub_date.cmp(&b.pub_date));
        let excess = downloaded.len() - limit;
        for record in downloaded.iter().take(excess) {
            info!(
                episode_id = %record.episode_id,
                podcast = podcast_key,
                limit,
                "Evicting download over limit"
            );
            self.delete_download(&record.episode_id).await?;
        }
        Ok(excess)
    }

    /// Remove a download and its file; returns whether a record existed
    pub async fn delete_download(&self, episode_id: &EpisodeId) -> Result<bool> {
        let inner = &self.inner;
        let Some(record) = inner.store.remove_record(episode_id).await? else {
            return Ok(false);
        };
        if let Err(e) = inner
            .downloader
            .delete(episode_id, record.file_path.as_deref())
            .await
        {
            warn!(episode_id = %episode_id, error = %e, "Failed to delete episode file");
        }
        debug!(episode_id = %episode_id, "Download removed");
        Ok(true)
    }

    /// Delete the finished episode's download if auto-delete is on
    pub async fn handle_episode_completed(&self, episode_id: &EpisodeId) -> Result<bool> {
        if !self.inner.settings.auto_delete_episode_on_end().await? {
            return Ok(false);
        }
        let deleted = self.delete_download(episode_id).await?;
        if deleted {
            info!(episode_id = %episode_id, "Deleted download of finished episode");
        }
        Ok(deleted)
    }

    pub async fn get_download_state(
        &self,
        episode_id: &EpisodeId,
        podcast_key: &str,
    ) -> Result<DownloadState> {
        let inner = &self.inner;
        let record = inner.store.record(episode_id).await?;
        Ok(DownloadState {
            is_downloading: record.as_ref().is_some_and(|r| r.is_downloading),
            is_downloaded: record.as_ref().is_some_and(|r| r.is_downloaded),
            auto_download_enabled: inner.store.is_auto_download_enabled(podcast_key).await?,
            downloaded_episode_limit: inner.store.episode_limit(podcast_key).await?,
            file_path: record.and_then(|r| r.file_path),
        })
    }

    /// All download records, oldest publish date first
    pub async fn downloads(&self) -> Result<Vec<DownloadRecord>> {
        let mut records: Vec<_> = self.inner.store.records().await?.into_values().collect();
        records.sort_by(|a, b| a.pub_date.cmp(&b.pub_date));
        Ok(records)
    }

    pub async fn set_auto_download(&self, podcast_key: &str, enabled: bool) -> Result<()> {
        info!(podcast = podcast_key, enabled, "Auto-download setting changed");
        if enabled {
            self.inner.store.set_auto_download(podcast_key, true).await?;
        } else {
            self.inner.store.remove_auto_download(podcast_key).await?;
        }
        Ok(())
    }

    /// Set a podcast's download limit and evict anything now over it
    ///
    /// Returns how many downloads were evicted. A limit of 0 is unlimited.
    pub async fn set_download_limit(&self, podcast_key: &str, limit: u32) -> Result<usize> {
        self.inner.store.set_episode_limit(podcast_key, limit).await?;
        self.evict(podcast_key).await
    }
}
