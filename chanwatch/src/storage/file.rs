//! Plain-text channel list with atomic rewrites.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::ChannelListStore;
use crate::Result;

/// One channel id per line. Any whitespace separates ids on load.
pub struct FileChannelStore {
    path: PathBuf,
}

impl FileChannelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl ChannelListStore for FileChannelStore {
    async fn load(&self) -> Result<Vec<String>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Channel list does not exist yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(content.split_whitespace().map(str::to_string).collect())
    }

    async fn save(&self, channel_ids: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let mut content = String::with_capacity(channel_ids.iter().map(|id| id.len() + 1).sum());
        for id in channel_ids {
            content.push_str(id);
            content.push('\n');
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, content.as_bytes()).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), count = channel_ids.len(), "Saved channel list");
        Ok(())
    }
}
