//! Configuration for the tracker and the driver binary.
//!
//! `TrackerConfig` carries the polling intervals used by the engine.
//! `AppConfig` is the TOML file read by the binary; every section is
//! optional and falls back to defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tracing::info;
use twitch_api::KrakenConfig;

use crate::{Error, Result};

/// Polling intervals and page sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// How long a liveness result is reused before the API is asked again.
    pub uptime_cache_window: TimeDelta,
    /// Minimum time between two follower scans.
    pub follower_interval: TimeDelta,
    /// Followers fetched per channel per scan.
    pub follower_page_size: usize,
    /// Broadcasts inspected when resolving the current recording.
    pub vod_page_size: usize,
    /// Minimum time between two saves of the notification list.
    pub autosave_interval: TimeDelta,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            uptime_cache_window: TimeDelta::seconds(120),
            follower_interval: TimeDelta::seconds(60),
            follower_page_size: 10,
            vod_page_size: 1,
            autosave_interval: TimeDelta::seconds(300),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.uptime_cache_window < TimeDelta::zero() {
            return Err(Error::config("uptime cache window must not be negative"));
        }
        if self.follower_interval <= TimeDelta::zero() {
            return Err(Error::config("follower interval must be positive"));
        }
        if self.autosave_interval <= TimeDelta::zero() {
            return Err(Error::config("autosave interval must be positive"));
        }
        if self.follower_page_size == 0 {
            return Err(Error::config("follower page size must be at least 1"));
        }
        if self.vod_page_size == 0 {
            return Err(Error::config("vod page size must be at least 1"));
        }
        Ok(())
    }
}

/// `[twitch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitchSection {
    pub base_url: String,
    pub client_id: String,
    pub oauth_token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for TwitchSection {
    fn default() -> Self {
        let defaults = KrakenConfig::default();
        Self {
            base_url: defaults.base_url,
            client_id: defaults.client_id,
            oauth_token: None,
            request_timeout_secs: defaults.request_timeout.as_secs(),
        }
    }
}

impl TwitchSection {
    pub fn to_kraken_config(&self) -> KrakenConfig {
        KrakenConfig {
            base_url: self.base_url.clone(),
            client_id: self.client_id.clone(),
            oauth_token: self.oauth_token.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// `[tracker]` section, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSection {
    pub uptime_cache_secs: i64,
    pub follower_interval_secs: i64,
    pub follower_page_size: usize,
    pub vod_page_size: usize,
    pub autosave_interval_secs: i64,
}

impl Default for TrackerSection {
    fn default() -> Self {
        let defaults = TrackerConfig::default();
        Self {
            uptime_cache_secs: defaults.uptime_cache_window.num_seconds(),
            follower_interval_secs: defaults.follower_interval.num_seconds(),
            follower_page_size: defaults.follower_page_size,
            vod_page_size: defaults.vod_page_size,
            autosave_interval_secs: defaults.autosave_interval.num_seconds(),
        }
    }
}

impl TrackerSection {
    pub fn to_tracker_config(&self) -> Result<TrackerConfig> {
        let config = TrackerConfig {
            uptime_cache_window: seconds(self.uptime_cache_secs)?,
            follower_interval: seconds(self.follower_interval_secs)?,
            follower_page_size: self.follower_page_size,
            vod_page_size: self.vod_page_size,
            autosave_interval: seconds(self.autosave_interval_secs)?,
        };
        config.validate()?;
        Ok(config)
    }
}

fn seconds(secs: i64) -> Result<TimeDelta> {
    TimeDelta::try_seconds(secs).ok_or_else(|| Error::config(format!("{secs}s is out of range")))
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub twitch: TwitchSection,
    pub tracker: TrackerSection,
    /// Channels with follower notification enabled, one id per token.
    pub data_file: PathBuf,
    /// Global admins allowed to run admin commands in any channel.
    pub admins: Vec<String>,
    pub log_filter: Option<String>,
    pub log_dir: Option<PathBuf>,
    /// How often the driver ticks the tracker.
    pub tick_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            twitch: TwitchSection::default(),
            tracker: TrackerSection::default(),
            data_file: PathBuf::from("twitch.list"),
            admins: Vec::new(),
            log_filter: None,
            log_dir: None,
            tick_interval_secs: 5,
        }
    }
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .map_err(|e| Error::config(format!("Invalid configuration: {e}")))?;
        if config.tick_interval_secs == 0 {
            return Err(Error::config("tick interval must be at least 1 second"));
        }
        Ok(config)
    }

    /// Read `path`, or return defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No configuration file; using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}
