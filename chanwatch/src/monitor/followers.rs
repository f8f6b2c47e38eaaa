//! Follower scanning with a per-channel time watermark.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use twitch_api::{ApiError, TwitchApi, channel_login};

use crate::channel::{ChannelRegistry, ChannelState};

use super::events::{TrackerEvent, TrackerEventBroadcaster};
use super::uptime::UptimePoller;

/// New followers of one channel, in the order the API returned them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowerNotification {
    pub channel: String,
    pub followers: Vec<String>,
}

impl FollowerNotification {
    /// Chat text announcing the followers.
    pub fn message(&self) -> String {
        match self.followers.as_slice() {
            [single] => format!("Thank you to {single} for following the channel! <3"),
            names => format!("Thank you new followers: {}! <3", names.join(", ")),
        }
    }
}

/// Follows newer than the watermark, with the latest follow time among them.
#[derive(Debug, Default)]
struct NewFollows {
    names: Vec<String>,
    latest: Option<DateTime<Utc>>,
}

pub struct FollowerPoller {
    api: Arc<dyn TwitchApi>,
    page_size: usize,
    events: TrackerEventBroadcaster,
}

impl FollowerPoller {
    pub fn new(api: Arc<dyn TwitchApi>, page_size: usize, events: TrackerEventBroadcaster) -> Self {
        Self {
            api,
            page_size,
            events,
        }
    }

    /// Scan every opted-in live channel once.
    ///
    /// Channels that are not opted in are skipped before any remote call;
    /// opted-in channels are skipped when `uptime` reports them offline.
    /// A channel whose follower page fails to load or parse is skipped for
    /// this run with its watermark untouched.
    pub async fn run(
        &self,
        registry: &mut ChannelRegistry,
        uptime: &UptimePoller,
        now: DateTime<Utc>,
    ) -> Vec<FollowerNotification> {
        let mut notifications = Vec::new();

        for position in 0..registry.len() {
            let Some((channel, state)) = registry.entry_mut(position) else {
                break;
            };
            if !state.notify_enabled() || !uptime.is_live(channel, state, now).await {
                continue;
            }

            match self.scan_channel(channel, state).await {
                Ok(names) if names.is_empty() => {
                    debug!(channel = %channel, "No new followers");
                }
                Ok(names) => {
                    info!(channel = %channel, count = names.len(), "New followers");
                    self.events.publish(TrackerEvent::NewFollowers {
                        channel: channel.to_string(),
                        names: names.clone(),
                        timestamp: now,
                    });
                    notifications.push(FollowerNotification {
                        channel: channel.to_string(),
                        followers: names,
                    });
                }
                Err(e) if e.is_transport() => {
                    warn!(channel = %channel, error = %e, "Failed to get followers; skipping this cycle");
                }
                Err(e) => {
                    warn!(channel = %channel, error = %e, "Malformed follower list; watermark unchanged");
                }
            }
        }

        notifications
    }

    /// Fetch one page of followers and advance the watermark past the new ones.
    ///
    /// Returns the new follower names. Nothing is mutated on error.
    pub async fn scan_channel(
        &self,
        channel: &str,
        state: &mut ChannelState,
    ) -> Result<Vec<String>, ApiError> {
        let list = self
            .api
            .get_channel_followers(channel_login(channel), self.page_size)
            .await?;
        let new = Self::collect_new(list.follows()?, state.last_follower_time())?;

        if let Some(latest) = new.latest {
            state.advance_follower_watermark(latest);
        }
        Ok(new.names)
    }

    fn collect_new(
        follows: &[twitch_api::Follow],
        watermark: DateTime<Utc>,
    ) -> Result<NewFollows, ApiError> {
        let mut new = NewFollows::default();
        for follow in follows {
            let created_at = follow.created_at()?;
            let name = follow.display_name()?;
            if created_at > watermark {
                new.names.push(name.to_string());
                new.latest = new.latest.max(Some(created_at));
            }
        }
        Ok(new)
    }
}
