//! Persistence of the follower-notification channel list.

mod file;
mod memory;

use async_trait::async_trait;

use crate::Result;

pub use file::FileChannelStore;
pub use memory::MemoryChannelStore;

/// Storage for the ids of channels with follower notification enabled.
#[async_trait]
pub trait ChannelListStore: Send + Sync {
    /// Read the full list. A store that was never written is empty.
    async fn load(&self) -> Result<Vec<String>>;

    /// Replace the stored list.
    async fn save(&self, channel_ids: &[String]) -> Result<()>;
}
