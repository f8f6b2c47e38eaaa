//! chanwatch library crate.
//!
//! Tracks Twitch channels on behalf of a chat bot: cached live status,
//! the current broadcast recording, and de-duplicated follower
//! announcements for channels that opted in.

pub mod channel;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod ports;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod testing;

pub use error::{Error, Result};
pub use service::Tracker;
