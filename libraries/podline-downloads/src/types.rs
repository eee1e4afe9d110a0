use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// What started a scheduler pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerTrigger {
    AppForeground,        // App came back to the foreground
    ConnectivityRegained, // Network went from invalid to valid
    ExplicitRefresh,      // User asked for a refresh
}

/// Result of a call to `DownloadScheduler::run`
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerRun {
    /// This call ran the passes, one summary each; at most two
    Completed(Vec<PassSummary>),
    /// A pass was already running and will run once more instead
    Coalesced,
}

/// Why a pass stopped before talking to the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassSkip {
    NoPodcasts,
    NoConnection,
}

/// Summary of one scheduler pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassSummary {
    pub run_id: String,
    pub trigger: SchedulerTrigger,
    pub started_at: DateTime<Utc>,
    pub skipped: Option<PassSkip>,
    pub episodes_checked: usize,
    pub downloaded: usize,
    pub already_present: usize,
    pub deferred_wifi_only: usize,
    pub failed: usize,
    pub evicted: usize,
    /// Whether the refresh cursor moved to `started_at`
    pub refreshed: bool,
}

impl PassSummary {
    pub(crate) fn new(run_id: String, trigger: SchedulerTrigger, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            trigger,
            started_at,
            skipped: None,
            episodes_checked: 0,
            downloaded: 0,
            already_present: 0,
            deferred_wifi_only: 0,
            failed: 0,
            evicted: 0,
            refreshed: false,
        }
    }
}

/// Result of a manual download request
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    /// Written to this path
    Completed(PathBuf),
    /// Already downloading or downloaded
    AlreadyPresent,
    /// Not allowed right now; shown to the user, not an error
    Blocked(BlockedReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockedReason {
    WifiOnly,
    NoConnection,
    OfflineMode,
}

impl fmt::Display for BlockedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::WifiOnly => "Downloads are limited to wifi",
            Self::NoConnection => "No internet connection",
            Self::OfflineMode => "Offline mode is on",
        };
        f.write_str(text)
    }
}
