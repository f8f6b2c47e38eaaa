use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chanwatch::commands::Command;
use chanwatch::config::AppConfig;
use chanwatch::logging;
use chanwatch::ports::{MessageSink, StaticAdmins};
use chanwatch::storage::FileChannelStore;
use chanwatch::Tracker;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use twitch_api::KrakenClient;

/// Twitch channel uptime tracker and follower notifier.
///
/// Reads `#channel user command [arg]` lines from stdin and prints replies
/// and follower announcements to stdout.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file (TOML).
    #[arg(short, long, env = "CHANWATCH_CONFIG", default_value = "chanwatch.toml")]
    config: PathBuf,

    /// Channel list file, overriding the configuration.
    #[arg(long, env = "CHANWATCH_DATA_FILE")]
    data_file: Option<PathBuf>,

    /// Log filter directive, e.g. "chanwatch=debug".
    #[arg(long, env = "CHANWATCH_LOG")]
    log_filter: Option<String>,

    #[arg(long, env = "TWITCH_CLIENT_ID")]
    client_id: Option<String>,

    #[arg(long, env = "TWITCH_OAUTH_TOKEN", hide_env_values = true)]
    oauth_token: Option<String>,
}

/// Prints messages to stdout.
struct ConsoleSink;

#[async_trait]
impl MessageSink for ConsoleSink {
    async fn send_message(&self, channel: &str, text: &str) {
        println!("[{channel}] {text}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = AppConfig::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    if let Some(data_file) = args.data_file {
        config.data_file = data_file;
    }
    if let Some(filter) = args.log_filter {
        config.log_filter = Some(filter);
    }
    if let Some(client_id) = args.client_id {
        config.twitch.client_id = client_id;
    }
    if args.oauth_token.is_some() {
        config.twitch.oauth_token = args.oauth_token;
    }

    let _log_guard = logging::init_logging(config.log_filter.as_deref(), config.log_dir.as_deref())?;

    let tracker_config = config.tracker.to_tracker_config()?;
    let api = KrakenClient::new(&config.twitch.to_kraken_config())?;
    let store = FileChannelStore::new(&config.data_file);

    let mut tracker = Tracker::new(
        Arc::new(api),
        Arc::new(store),
        Arc::new(ConsoleSink),
        tracker_config,
    )
    .with_admins(Arc::new(StaticAdmins::new(&config.admins)));

    tracker
        .load()
        .await
        .with_context(|| format!("failed to read {}", config.data_file.display()))?;

    let mut events = tracker.subscribe_events();
    let mut ticker = tokio::time::interval(Duration::from_secs(config.tick_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        data_file = %config.data_file.display(),
        channels = tracker.registry().len(),
        "chanwatch started"
    );

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
            _ = ticker.tick() => {
                tracker.tick().await;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => handle_line(&mut tracker, &line).await,
                Ok(None) => {
                    debug!("stdin closed");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    stdin_open = false;
                }
            },
            Ok(event) = events.recv() => {
                debug!(channel = %event.channel(), "{}", event.description());
            }
        }
    }

    tracker.shutdown().await?;
    Ok(())
}

/// Handle `#channel user command [arg]`. A leading `!` on the command is ignored.
async fn handle_line(tracker: &mut Tracker, line: &str) {
    let mut parts = line.split_whitespace();
    let (Some(channel), Some(user), Some(name)) = (parts.next(), parts.next(), parts.next())
    else {
        if !line.trim().is_empty() {
            warn!("Expected: #channel user command [arg]");
        }
        return;
    };
    let arg = parts.next();

    let Some(command) = Command::parse(name.trim_start_matches('!'), arg) else {
        debug!(command = %name, "Unknown command");
        return;
    };

    let request = tracker.request(channel, user);
    tracker.handle_command(&request, command).await;
}
