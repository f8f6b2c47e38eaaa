use async_trait::async_trait;
use parking_lot::Mutex;

use super::ChannelListStore;
use crate::Result;

/// In-memory store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryChannelStore {
    channels: Mutex<Vec<String>>,
    saves: Mutex<usize>,
}

impl MemoryChannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channels<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: Mutex::new(channels.into_iter().map(Into::into).collect()),
            saves: Mutex::new(0),
        }
    }

    pub fn channels(&self) -> Vec<String> {
        self.channels.lock().clone()
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

#[async_trait]
impl ChannelListStore for MemoryChannelStore {
    async fn load(&self) -> Result<Vec<String>> {
        Ok(self.channels.lock().clone())
    }

    async fn save(&self, channel_ids: &[String]) -> Result<()> {
        *self.channels.lock() = channel_ids.to_vec();
        *self.saves.lock() += 1;
        Ok(())
    }
}
