//! Pollers for channel liveness, recordings and followers.
//!
//! - [`UptimePoller`] caches live/offline status per channel
//! - [`VodResolver`] resolves and caches the current recording URL
//! - [`FollowerPoller`] announces followers newer than each channel's watermark
//!
//! Remote failures never escape a poller; they are logged and folded into
//! channel state.

mod events;
mod followers;
mod uptime;
mod vod;

pub use events::{TrackerEvent, TrackerEventBroadcaster};
pub use followers::{FollowerNotification, FollowerPoller};
pub use uptime::UptimePoller;
pub use vod::VodResolver;
