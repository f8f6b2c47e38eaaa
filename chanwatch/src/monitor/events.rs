//! Tracker events.
//!
//! Pollers publish liveness and follower events so hosts can observe the
//! engine without inspecting channel state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted by the pollers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerEvent {
    /// Channel went live, or restarted its stream.
    WentLive {
        channel: String,
        started_at: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    /// Channel went offline. Includes failed polls.
    WentOffline {
        channel: String,
        timestamp: DateTime<Utc>,
    },
    /// A recording URL was resolved and cached.
    VodResolved {
        channel: String,
        url: String,
        timestamp: DateTime<Utc>,
    },
    /// A follower scan found new followers.
    NewFollowers {
        channel: String,
        names: Vec<String>,
        timestamp: DateTime<Utc>,
    },
}

impl TrackerEvent {
    pub fn channel(&self) -> &str {
        match self {
            TrackerEvent::WentLive { channel, .. }
            | TrackerEvent::WentOffline { channel, .. }
            | TrackerEvent::VodResolved { channel, .. }
            | TrackerEvent::NewFollowers { channel, .. } => channel,
        }
    }

    /// Get a human-readable description of the event.
    pub fn description(&self) -> String {
        match self {
            TrackerEvent::WentLive {
                channel,
                started_at,
                ..
            } => format!("{} is live since {}", channel, started_at),
            TrackerEvent::WentOffline { channel, .. } => format!("{} went offline", channel),
            TrackerEvent::VodResolved { channel, url, .. } => {
                format!("{} is recording to {}", channel, url)
            }
            TrackerEvent::NewFollowers { channel, names, .. } => {
                format!("{} has {} new follower(s)", channel, names.len())
            }
        }
    }
}

/// Broadcaster for tracker events.
#[derive(Clone)]
pub struct TrackerEventBroadcaster {
    sender: broadcast::Sender<TrackerEvent>,
}

impl TrackerEventBroadcaster {
    /// Create a new broadcaster holding up to 256 undelivered events.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn publish(&self, event: TrackerEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for TrackerEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_description() {
        let event = TrackerEvent::NewFollowers {
            channel: "#test".to_string(),
            names: vec!["Alice".to_string(), "Bob".to_string()],
            timestamp: Utc::now(),
        };
        assert_eq!(event.channel(), "#test");
        assert!(event.description().contains("2 new follower"));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let broadcaster = TrackerEventBroadcaster::new();
        broadcaster.publish(TrackerEvent::WentOffline {
            channel: "#test".to_string(),
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn test_broadcaster_publish_subscribe() {
        let broadcaster = TrackerEventBroadcaster::new();
        let mut receiver = broadcaster.subscribe();

        broadcaster.publish(TrackerEvent::WentOffline {
            channel: "#test".to_string(),
            timestamp: Utc::now(),
        });

        let received = receiver.try_recv().unwrap();
        assert!(matches!(received, TrackerEvent::WentOffline { .. }));
    }

    #[test]
    fn test_event_json_shape() {
        let event = TrackerEvent::VodResolved {
            channel: "#test".to_string(),
            url: "https://www.twitch.tv/videos/1".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["VodResolved"]["channel"], "#test");

        let back: TrackerEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
