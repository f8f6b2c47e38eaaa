//! Cached live/offline detection.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, trace, warn};
use twitch_api::{ApiError, TwitchApi, channel_login};

use crate::channel::{ChannelState, LiveTransition};

use super::events::{TrackerEvent, TrackerEventBroadcaster};

/// Answers "is this channel live?" with at most one remote query per cache window.
pub struct UptimePoller {
    api: Arc<dyn TwitchApi>,
    cache_window: TimeDelta,
    events: TrackerEventBroadcaster,
}

impl UptimePoller {
    pub fn new(
        api: Arc<dyn TwitchApi>,
        cache_window: TimeDelta,
        events: TrackerEventBroadcaster,
    ) -> Self {
        Self {
            api,
            cache_window,
            events,
        }
    }

    /// Whether `channel` is live at `now`.
    ///
    /// Within the cache window the stored answer is returned as is. Otherwise
    /// the stream info is queried and the check time recorded whatever the
    /// outcome. A failed query or a missing or unparseable start time leaves
    /// the channel offline with its recording cache cleared.
    pub async fn is_live(&self, channel: &str, state: &mut ChannelState, now: DateTime<Utc>) -> bool {
        if !state.uptime_check_due(now, self.cache_window) {
            trace!(channel = %channel, live = state.is_live(), "Uptime cache hit");
            return state.is_live();
        }

        let result = self.fetch_stream_start(channel).await;
        state.record_uptime_check(now);

        let transition = match result {
            Ok(Some(started_at)) => state.mark_live(started_at),
            Ok(None) => {
                debug!(channel = %channel, "Stream is offline");
                state.mark_offline()
            }
            Err(e) if e.is_transport() => {
                warn!(channel = %channel, error = %e, "Failed to get uptime; treating channel as offline");
                state.mark_offline()
            }
            Err(e) => {
                warn!(channel = %channel, error = %e, "Malformed stream info; treating channel as offline");
                state.mark_offline()
            }
        };

        if let Some(transition) = transition {
            self.publish(channel, transition, now);
        }

        state.is_live()
    }

    async fn fetch_stream_start(&self, channel: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
        let info = self.api.get_stream_info(channel_login(channel)).await?;
        info.started_at()
    }

    fn publish(&self, channel: &str, transition: LiveTransition, now: DateTime<Utc>) {
        let event = match transition {
            LiveTransition::WentLive { started_at } | LiveTransition::Restarted { started_at } => {
                info!(channel = %channel, %started_at, "Channel is live");
                TrackerEvent::WentLive {
                    channel: channel.to_string(),
                    started_at,
                    timestamp: now,
                }
            }
            LiveTransition::WentOffline => {
                info!(channel = %channel, "Channel went offline");
                TrackerEvent::WentOffline {
                    channel: channel.to_string(),
                    timestamp: now,
                }
            }
        };
        self.events.publish(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedApi;
    use chrono::TimeZone;

    fn poller(api: &Arc<ScriptedApi>) -> UptimePoller {
        UptimePoller::new(
            api.clone(),
            TimeDelta::seconds(120),
            TrackerEventBroadcaster::new(),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_live_then_cached() {
        let api = Arc::new(ScriptedApi::new());
        api.set_stream("insofaras", Some("2024-01-01T10:00:00Z"));
        let poller = poller(&api);
        let mut state = ChannelState::default();

        assert!(poller.is_live("#insofaras", &mut state, now()).await);
        assert_eq!(
            state.stream_start(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap())
        );

        api.set_stream("insofaras", None);
        assert!(
            poller
                .is_live("#insofaras", &mut state, now() + TimeDelta::seconds(120))
                .await
        );
        assert_eq!(api.stream_calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_offline_and_rate_limited() {
        let api = Arc::new(ScriptedApi::new());
        api.set_stream("insofaras", Some("2024-01-01T10:00:00Z"));
        let poller = poller(&api);
        let mut state = ChannelState::default();
        assert!(poller.is_live("#insofaras", &mut state, now()).await);
        state.cache_vod_url("http://example/x");

        api.fail_streams(true);
        let later = now() + TimeDelta::seconds(121);
        assert!(!poller.is_live("#insofaras", &mut state, later).await);
        assert_eq!(state.vod_url(), None);
        assert_eq!(state.last_uptime_check(), later);

        assert!(!poller.is_live("#insofaras", &mut state, later).await);
        assert_eq!(api.stream_calls(), 2);
    }

    #[tokio::test]
    async fn test_bad_timestamp_is_offline() {
        let api = Arc::new(ScriptedApi::new());
        api.set_stream("insofaras", Some("yesterday"));
        let poller = poller(&api);
        let mut state = ChannelState::default();
        assert!(!poller.is_live("#insofaras", &mut state, now()).await);
        assert_eq!(state.stream_start(), None);
    }

    #[tokio::test]
    async fn test_transition_events() {
        let api = Arc::new(ScriptedApi::new());
        let events = TrackerEventBroadcaster::new();
        let mut rx = events.subscribe();
        let poller = UptimePoller::new(api.clone(), TimeDelta::seconds(120), events);
        let mut state = ChannelState::default();

        api.set_stream("a", Some("2024-01-01T10:00:00Z"));
        poller.is_live("#a", &mut state, now()).await;
        assert!(matches!(rx.try_recv().unwrap(), TrackerEvent::WentLive { .. }));

        api.set_stream("a", None);
        poller
            .is_live("#a", &mut state, now() + TimeDelta::seconds(500))
            .await;
        assert!(matches!(rx.try_recv().unwrap(), TrackerEvent::WentOffline { .. }));
        assert!(rx.try_recv().is_err());
    }
}
