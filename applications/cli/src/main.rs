/// Podline - podcast playback state and download maintenance
use clap::Parser;
use podline_cli::{commands, App, AppConfig, Command};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "podline")]
#[command(about = "Inspect and maintain Podline listening state", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./podline.toml)
    #[arg(short, long, env = "PODLINE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "podline=info,podline_playback=info,podline_downloads=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    config.validate()?;
    tracing::debug!(connection = ?config.network.connection, "Configuration loaded");

    let app = App::open(&config).await?;
    let mut stdout = std::io::stdout();
    commands::run(&app, cli.command, &mut stdout).await?;

    Ok(())
}
