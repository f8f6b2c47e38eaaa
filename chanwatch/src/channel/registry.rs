//! Registry of tracked channels.
//!
//! Entries are created lazily and never removed. Enumeration follows
//! insertion order so persisted output is deterministic.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use tracing::debug;

use super::state::ChannelState;

#[derive(Debug, Default)]
pub struct ChannelRegistry {
    entries: Vec<(String, ChannelState)>,
    index: FxHashMap<String, usize>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the state for `channel_id`, inserting a zero-valued entry first if needed.
    pub fn get_or_create(&mut self, channel_id: &str) -> &mut ChannelState {
        let idx = match self.index.get(channel_id) {
            Some(&idx) => idx,
            None => {
                debug!(channel = %channel_id, "Tracking new channel");
                let idx = self.entries.len();
                self.entries
                    .push((channel_id.to_string(), ChannelState::default()));
                self.index.insert(channel_id.to_string(), idx);
                idx
            }
        };
        &mut self.entries[idx].1
    }

    pub fn get(&self, channel_id: &str) -> Option<&ChannelState> {
        self.index.get(channel_id).map(|&idx| &self.entries[idx].1)
    }

    /// Entry at an enumeration position.
    pub fn entry_mut(&mut self, position: usize) -> Option<(&str, &mut ChannelState)> {
        self.entries
            .get_mut(position)
            .map(|(id, state)| (id.as_str(), state))
    }

    /// All entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChannelState)> {
        self.entries.iter().map(|(id, state)| (id.as_str(), state))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids of channels with follower notification enabled, in insertion order.
    pub fn notify_enabled_ids(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, state)| state.notify_enabled())
            .map(|(id, _)| id.to_string())
            .collect()
    }

    /// Apply a persisted notification list.
    ///
    /// Watermarks start at `now` so follows from before tracking began are
    /// never announced.
    pub fn apply_notify_list<I, S>(&mut self, channel_ids: I, now: DateTime<Utc>) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut count = 0;
        for channel_id in channel_ids {
            let state = self.get_or_create(channel_id.as_ref());
            state.set_notify_enabled(true);
            state.advance_follower_watermark(now);
            count += 1;
        }
        count
    }
}
