//! Read-only access to the Twitch endpoints used for channel tracking.
//!
//! The crate exposes the [`TwitchApi`] port together with a reqwest-backed
//! [`KrakenClient`] implementation. Response models keep every leaf field
//! optional so callers can report exactly which field was missing.

pub mod client;
pub mod error;
pub mod models;
pub mod time;

pub use client::{KrakenClient, KrakenConfig, TwitchApi, channel_login, install_rustls_provider};
pub use error::ApiError;
pub use models::{Follow, FollowList, FollowUser, Stream, StreamInfo, Video, VideoList};
pub use time::parse_timestamp;
