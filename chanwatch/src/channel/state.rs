//! Per-channel tracking state.

use chrono::{DateTime, TimeDelta, Utc};

/// Liveness change produced by an uptime poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveTransition {
    /// OFFLINE -> LIVE.
    WentLive { started_at: DateTime<Utc> },
    /// LIVE -> LIVE with a new start time (stream restarted).
    Restarted { started_at: DateTime<Utc> },
    /// LIVE -> OFFLINE.
    WentOffline,
}

/// State of one tracked channel.
///
/// `vod_url` is only ever set while `stream_start` is set; every path that
/// clears `stream_start` goes through [`ChannelState::mark_offline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    notify_enabled: bool,
    stream_start: Option<DateTime<Utc>>,
    last_uptime_check: DateTime<Utc>,
    last_follower_time: DateTime<Utc>,
    vod_url: Option<String>,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            notify_enabled: false,
            stream_start: None,
            last_uptime_check: DateTime::<Utc>::UNIX_EPOCH,
            last_follower_time: DateTime::<Utc>::UNIX_EPOCH,
            vod_url: None,
        }
    }
}

impl ChannelState {
    pub fn notify_enabled(&self) -> bool {
        self.notify_enabled
    }

    pub fn set_notify_enabled(&mut self, enabled: bool) {
        self.notify_enabled = enabled;
    }

    pub fn stream_start(&self) -> Option<DateTime<Utc>> {
        self.stream_start
    }

    pub fn is_live(&self) -> bool {
        self.stream_start.is_some()
    }

    pub fn last_uptime_check(&self) -> DateTime<Utc> {
        self.last_uptime_check
    }

    pub fn last_follower_time(&self) -> DateTime<Utc> {
        self.last_follower_time
    }

    pub fn vod_url(&self) -> Option<&str> {
        self.vod_url.as_deref()
    }

    /// Whether the cached liveness is older than `window`.
    pub fn uptime_check_due(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        now - self.last_uptime_check > window
    }

    pub fn record_uptime_check(&mut self, now: DateTime<Utc>) {
        self.last_uptime_check = now;
    }

    /// Record a parsed stream start.
    pub fn mark_live(&mut self, started_at: DateTime<Utc>) -> Option<LiveTransition> {
        let previous = self.stream_start.replace(started_at);
        match previous {
            None => Some(LiveTransition::WentLive { started_at }),
            Some(prev) if prev != started_at => Some(LiveTransition::Restarted { started_at }),
            Some(_) => None,
        }
    }

    /// Clear the stream start and the recording cache with it.
    pub fn mark_offline(&mut self) -> Option<LiveTransition> {
        self.vod_url = None;
        self.stream_start
            .take()
            .map(|_| LiveTransition::WentOffline)
    }

    /// Cache the current recording URL. Ignored while offline.
    pub fn cache_vod_url(&mut self, url: impl Into<String>) -> bool {
        if self.stream_start.is_none() {
            return false;
        }
        self.vod_url = Some(url.into());
        true
    }

    /// Move the follower watermark forward. Earlier instants are ignored.
    pub fn advance_follower_watermark(&mut self, seen: DateTime<Utc>) {
        if seen > self.last_follower_time {
            self.last_follower_time = seen;
        }
    }

    /// Live duration at `now`, if live.
    pub fn uptime(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.stream_start.map(|start| now - start)
    }
}
