//! Subcommands and their handlers
//!
//! Handlers write human-readable output to the given writer so they can be
//! driven from tests.

use crate::app::App;
use crate::error::{CliError, Result};
use clap::{Args, Subcommand, ValueEnum};
use podline_core::types::{AutoQueuePosition, ClipId, EpisodeId, PlaybackIdentity};
use podline_downloads::{PassSummary, SchedulerRun, SchedulerTrigger};
use std::io::Write;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Listening history
    #[command(subcommand)]
    History(HistoryCommand),
    /// Playback queue
    #[command(subcommand)]
    Queue(QueueCommand),
    /// Episode downloads
    #[command(subcommand)]
    Downloads(DownloadsCommand),
    /// User preferences
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List history records, most recent first
    List {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Merge the server's history into the local copy
    Sync,
    /// Remove one record
    Remove(IdentityArgs),
    /// Remove every record, locally and on the server
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    List,
    Remove(IdentityArgs),
    /// Move the item at FROM to TO (zero-based)
    Move { from: usize, to: usize },
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum DownloadsCommand {
    /// Fetch new episodes of auto-download podcasts
    Refresh,
    /// List downloaded and in-progress episodes
    List,
    /// Turn auto-download on or off for a podcast
    Auto {
        podcast: String,
        #[arg(long)]
        off: bool,
    },
    /// Keep at most N downloads of a podcast (0 = unlimited)
    Limit { podcast: String, limit: u32 },
    /// Download state of one episode
    Status { episode: String, podcast: String },
    /// Delete a downloaded episode
    Delete { episode: String },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    Set { key: SettingKey, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SettingKey {
    JumpBackwards,
    JumpForwards,
    PlaybackSpeed,
    WifiOnly,
    OfflineMode,
    AutoDelete,
    AutoQueuePosition,
    AutoPlayFromPodcast,
    AddCurrentNext,
}

/// Either `--episode ID` or `--clip ID`
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct IdentityArgs {
    #[arg(long)]
    pub episode: Option<String>,
    #[arg(long)]
    pub clip: Option<String>,
}

impl IdentityArgs {
    fn identity(&self) -> Result<PlaybackIdentity> {
        match (&self.episode, &self.clip) {
            (Some(id), None) => Ok(PlaybackIdentity::Episode(EpisodeId::new(id.as_str()))),
            (None, Some(id)) => Ok(PlaybackIdentity::Clip(ClipId::new(id.as_str()))),
            _ => Err(CliError::InvalidArgument(
                "pass exactly one of --episode or --clip".to_string(),
            )),
        }
    }
}

pub async fn run(app: &App, command: Command, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::History(cmd) => history(app, cmd, out).await?,
        Command::Queue(cmd) => queue(app, cmd, out).await?,
        Command::Downloads(cmd) => downloads(app, cmd, out).await?,
        Command::Settings(cmd) => settings(app, cmd, out).await?,
    }
    app.finish().await;
    Ok(())
}

async fn history(app: &App, command: HistoryCommand, out: &mut dyn Write) -> Result<()> {
    match command {
        HistoryCommand::List { limit } => {
            let items = app.history.items().await?;
            let shown = limit.unwrap_or(items.len());
            for record in items.iter().take(shown) {
                let title = record
                    .item
                    .as_ref()
                    .and_then(|i| i.clip_title.as_deref().or(i.episode_title.as_deref()))
                    .unwrap_or("-");
                let duration = record
                    .media_file_duration
                    .map_or_else(|| "?".to_string(), |d| format!("{:.0}", d));
                let status = if record.completed { "done" } else { "" };
                writeln!(
                    out,
                    "{}\t{:.0}/{}\t{}\t{}",
                    record.identity, record.user_playback_position, duration, status, title
                )?;
            }
            writeln!(out, "{} of {} records", shown.min(items.len()), items.len())?;
        }
        HistoryCommand::Sync => {
            let index = app.history.sync_with_remote().await?;
            writeln!(
                out,
                "History has {} episodes and {} clips",
                index.episodes.len(),
                index.clips.len()
            )?;
        }
        HistoryCommand::Remove(args) => {
            let identity = args.identity()?;
            if app.history.remove(&identity).await? {
                writeln!(out, "Removed {}", identity)?;
            } else {
                writeln!(out, "No history for {}", identity)?;
            }
        }
        HistoryCommand::Clear => {
            app.history.clear_all().await?;
            writeln!(out, "History cleared")?;
        }
    }
    Ok(())
}

async fn queue(app: &App, command: QueueCommand, out: &mut dyn Write) -> Result<()> {
    let mut queue = app.queue().await?;
    match command {
        QueueCommand::List => {
            for entry in queue.items() {
                let identity = entry
                    .item
                    .identity()
                    .map_or_else(|| "-".to_string(), |i| i.to_string());
                let title = entry.item.episode_title.as_deref().unwrap_or("-");
                writeln!(out, "{}\t{}\t{}", entry.position, identity, title)?;
            }
            if queue.is_empty() {
                writeln!(out, "Queue is empty")?;
            }
        }
        QueueCommand::Remove(args) => {
            let identity = args.identity()?;
            if queue.remove(&identity).await? {
                writeln!(out, "Removed {} from the queue", identity)?;
            } else {
                writeln!(out, "{} is not queued", identity)?;
            }
        }
        QueueCommand::Move { from, to } => {
            queue.reorder(from, to).await?;
            writeln!(out, "Moved {} to {}", from, to)?;
        }
        QueueCommand::Clear => {
            queue.clear().await?;
            writeln!(out, "Queue cleared")?;
        }
    }
    Ok(())
}

fn write_pass(out: &mut dyn Write, pass: &PassSummary) -> std::io::Result<()> {
    if let Some(skip) = pass.skipped {
        return writeln!(out, "Pass {} skipped: {:?}", pass.run_id, skip);
    }
    writeln!(
        out,
        "Pass {}: {} checked, {} downloaded, {} already present, {} waiting for wifi, {} failed, {} evicted",
        pass.run_id,
        pass.episodes_checked,
        pass.downloaded,
        pass.already_present,
        pass.deferred_wifi_only,
        pass.failed,
        pass.evicted
    )
}

async fn downloads(app: &App, command: DownloadsCommand, out: &mut dyn Write) -> Result<()> {
    let scheduler = &app.scheduler;
    match command {
        DownloadsCommand::Refresh => match scheduler.run(SchedulerTrigger::ExplicitRefresh).await? {
            SchedulerRun::Completed(passes) => {
                for pass in &passes {
                    write_pass(out, pass)?;
                }
            }
            SchedulerRun::Coalesced => writeln!(out, "A refresh is already running")?,
        },
        DownloadsCommand::List => {
            let records = scheduler.downloads().await?;
            for record in &records {
                let status = if record.is_downloading {
                    "downloading"
                } else {
                    "downloaded"
                };
                let path = record
                    .file_path
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |p| p.display().to_string());
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}",
                    record.episode_id, record.podcast_key, status, path
                )?;
            }
            writeln!(out, "{} downloads", records.len())?;
        }
        DownloadsCommand::Auto { podcast, off } => {
            scheduler.set_auto_download(&podcast, !off).await?;
            let state = if off { "off" } else { "on" };
            writeln!(out, "Auto-download {} for {}", state, podcast)?;
        }
        DownloadsCommand::Limit { podcast, limit } => {
            let evicted = scheduler.set_download_limit(&podcast, limit).await?;
            writeln!(
                out,
                "Limit for {} set to {} ({} evicted)",
                podcast, limit, evicted
            )?;
        }
        DownloadsCommand::Status { episode, podcast } => {
            let state = scheduler
                .get_download_state(&EpisodeId::new(episode.as_str()), &podcast)
                .await?;
            writeln!(out, "downloading: {}", state.is_downloading)?;
            writeln!(out, "downloaded: {}", state.is_downloaded)?;
            writeln!(out, "auto-download: {}", state.auto_download_enabled)?;
            writeln!(out, "limit: {}", state.downloaded_episode_limit)?;
            if let Some(path) = state.file_path {
                writeln!(out, "file: {}", path.display())?;
            }
        }
        DownloadsCommand::Delete { episode } => {
            let id = EpisodeId::new(episode.as_str());
            if scheduler.delete_download(&id).await? {
                writeln!(out, "Deleted {}", id)?;
            } else {
                writeln!(out, "{} is not downloaded", id)?;
            }
        }
    }
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(CliError::InvalidArgument(format!(
            "expected on/off, got {:?}",
            value
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::InvalidArgument(format!("not a number: {:?}", value)))
}

async fn settings(app: &App, command: SettingsCommand, out: &mut dyn Write) -> Result<()> {
    let settings = &app.settings;
    match command {
        SettingsCommand::Show => {
            writeln!(out, "jump-backwards: {}s", settings.jump_backwards_seconds().await?)?;
            writeln!(out, "jump-forwards: {}s", settings.jump_forwards_seconds().await?)?;
            writeln!(out, "playback-speed: {}", settings.playback_speed().await?)?;
            writeln!(out, "wifi-only: {}", settings.downloading_wifi_only().await?)?;
            writeln!(out, "offline-mode: {}", settings.offline_mode().await?)?;
            writeln!(out, "auto-delete: {}", settings.auto_delete_episode_on_end().await?)?;
            writeln!(
                out,
                "auto-queue-position: {:?}",
                settings.auto_queue_position().await?
            )?;
            writeln!(
                out,
                "auto-play-from-podcast: {}",
                settings.auto_play_episodes_from_podcast().await?
            )?;
            writeln!(
                out,
                "add-current-next: {}",
                settings.add_current_item_next_in_queue().await?
            )?;
            for (podcast, enabled) in settings.auto_queue_settings().await? {
                writeln!(out, "auto-queue {}: {}", podcast, enabled)?;
            }
        }
        SettingsCommand::Set { key, value } => {
            match key {
                SettingKey::JumpBackwards => {
                    settings
                        .set_jump_backwards_seconds(parse_number(&value)?)
                        .await?;
                }
                SettingKey::JumpForwards => {
                    settings
                        .set_jump_forwards_seconds(parse_number(&value)?)
                        .await?;
                }
                SettingKey::PlaybackSpeed => {
                    let speed: f64 = parse_number(&value)?;
                    if !speed.is_finite() || speed <= 0.0 {
                        return Err(CliError::InvalidArgument(format!(
                            "playback speed must be positive, got {}",
                            speed
                        )));
                    }
                    settings.set_playback_speed(speed).await?;
                }
                SettingKey::WifiOnly => {
                    settings.set_downloading_wifi_only(parse_bool(&value)?).await?;
                }
                SettingKey::OfflineMode => settings.set_offline_mode(parse_bool(&value)?).await?,
                SettingKey::AutoDelete => {
                    settings
                        .set_auto_delete_episode_on_end(parse_bool(&value)?)
                        .await?;
                }
                SettingKey::AutoQueuePosition => {
                    let position = match value.to_ascii_lowercase().as_str() {
                        "first" => AutoQueuePosition::First,
                        "last" => AutoQueuePosition::Last,
                        _ => {
                            return Err(CliError::InvalidArgument(format!(
                                "expected first or last, got {:?}",
                                value
                            )))
                        }
                    };
                    settings.set_auto_queue_position(position).await?;
                }
                SettingKey::AutoPlayFromPodcast => {
                    settings
                        .set_auto_play_episodes_from_podcast(parse_bool(&value)?)
                        .await?;
                }
                SettingKey::AddCurrentNext => {
                    settings
                        .set_add_current_item_next_in_queue(parse_bool(&value)?)
                        .await?;
                }
            }
            writeln!(out, "Updated {:?}", key)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert!(parse_bool("ON").unwrap());
        assert!(!parse_bool("no").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_identity_args() {
        let args = IdentityArgs {
            episode: None,
            clip: Some("c1".to_string()),
        };
        assert_eq!(
            args.identity().unwrap(),
            PlaybackIdentity::Clip(ClipId::new("c1"))
        );
    }
}
