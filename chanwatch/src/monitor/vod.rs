//! Resolution of the recording produced by a live stream.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use twitch_api::{ApiError, TwitchApi, channel_login};

use crate::channel::ChannelState;

use super::events::{TrackerEvent, TrackerEventBroadcaster};

pub struct VodResolver {
    api: Arc<dyn TwitchApi>,
    page_size: usize,
    events: TrackerEventBroadcaster,
}

impl VodResolver {
    pub fn new(api: Arc<dyn TwitchApi>, page_size: usize, events: TrackerEventBroadcaster) -> Self {
        Self {
            api,
            page_size,
            events,
        }
    }

    /// URL of the broadcast currently being recorded.
    ///
    /// Callers must have established that the channel is live. A cached URL
    /// is returned without a remote call; a lookup that finds nothing leaves
    /// the cache empty so the next call tries again.
    pub async fn vod_url(
        &self,
        channel: &str,
        state: &mut ChannelState,
        now: DateTime<Utc>,
    ) -> Option<String> {
        if let Some(url) = state.vod_url() {
            return Some(url.to_string());
        }

        match self.find_recording(channel).await {
            Ok(Some(url)) => {
                if !state.cache_vod_url(url.clone()) {
                    debug!(channel = %channel, "Channel is offline; not caching recording URL");
                    return None;
                }
                self.events.publish(TrackerEvent::VodResolved {
                    channel: channel.to_string(),
                    url: url.clone(),
                    timestamp: now,
                });
                Some(url)
            }
            Ok(None) => {
                debug!(channel = %channel, "No recording in progress");
                None
            }
            Err(e) => {
                warn!(channel = %channel, error = %e, "Failed to resolve recording");
                None
            }
        }
    }

    async fn find_recording(&self, channel: &str) -> Result<Option<String>, ApiError> {
        let list = self
            .api
            .get_channel_videos(channel_login(channel), true, self.page_size)
            .await?;
        for video in list.videos()? {
            if video.is_recording()? {
                return Ok(Some(video.url()?.to_string()));
            }
        }
        Ok(None)
    }
}
