//! In-process stand-ins for the remote API and the chat output.
//!
//! Used by the unit and integration tests; also handy for hosts that want
//! to dry-run the tracker without network access.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use twitch_api::{
    ApiError, Follow, FollowList, FollowUser, Stream, StreamInfo, TwitchApi, Video, VideoList,
};

use crate::ports::MessageSink;

/// Build a follower entry.
pub fn follow(created_at: &str, display_name: &str) -> Follow {
    Follow {
        created_at: Some(created_at.to_string()),
        user: Some(FollowUser {
            display_name: Some(display_name.to_string()),
        }),
    }
}

/// Build a video entry with optional fields.
pub fn video(status: Option<&str>, url: Option<&str>) -> Video {
    Video {
        status: status.map(str::to_string),
        url: url.map(str::to_string),
    }
}

#[derive(Debug, Default)]
struct Script {
    streams: HashMap<String, StreamInfo>,
    videos: HashMap<String, Vec<Video>>,
    followers: HashMap<String, FollowList>,
    fail_streams: bool,
    fail_videos: bool,
    fail_followers: bool,
    stream_calls: Vec<String>,
    video_calls: Vec<String>,
    follower_calls: Vec<String>,
    last_video_limit: Option<usize>,
    last_follower_limit: Option<usize>,
}

/// [`TwitchApi`] answering from scripted data and counting calls.
///
/// Channels without a script are offline, have no videos and no followers.
#[derive(Debug, Default)]
pub struct ScriptedApi {
    script: Mutex<Script>,
}

fn unavailable(endpoint: &str, channel: &str) -> ApiError {
    ApiError::Status {
        status: 503,
        url: format!("scripted://{endpoint}/{channel}"),
    }
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(created_at)` makes the channel live, `None` offline.
    pub fn set_stream(&self, channel: &str, created_at: Option<&str>) {
        let info = StreamInfo {
            stream: created_at.map(|at| Stream {
                created_at: Some(at.to_string()),
            }),
        };
        self.set_stream_info(channel, info);
    }

    pub fn set_stream_info(&self, channel: &str, info: StreamInfo) {
        self.script.lock().streams.insert(channel.to_string(), info);
    }

    pub fn set_videos(&self, channel: &str, videos: Vec<Video>) {
        self.script.lock().videos.insert(channel.to_string(), videos);
    }

    pub fn set_followers(&self, channel: &str, follows: Vec<Follow>) {
        self.set_follow_list(
            channel,
            FollowList {
                follows: Some(follows),
            },
        );
    }

    pub fn set_follow_list(&self, channel: &str, list: FollowList) {
        self.script.lock().followers.insert(channel.to_string(), list);
    }

    pub fn fail_streams(&self, fail: bool) {
        self.script.lock().fail_streams = fail;
    }

    pub fn fail_videos(&self, fail: bool) {
        self.script.lock().fail_videos = fail;
    }

    pub fn fail_followers(&self, fail: bool) {
        self.script.lock().fail_followers = fail;
    }

    pub fn stream_calls(&self) -> usize {
        self.script.lock().stream_calls.len()
    }

    pub fn video_calls(&self) -> usize {
        self.script.lock().video_calls.len()
    }

    pub fn follower_calls(&self) -> usize {
        self.script.lock().follower_calls.len()
    }

    /// Follower queries issued for one channel login.
    pub fn follower_calls_for(&self, channel: &str) -> usize {
        self.script
            .lock()
            .follower_calls
            .iter()
            .filter(|c| c.as_str() == channel)
            .count()
    }

    pub fn last_video_limit(&self) -> Option<usize> {
        self.script.lock().last_video_limit
    }

    pub fn last_follower_limit(&self) -> Option<usize> {
        self.script.lock().last_follower_limit
    }
}

#[async_trait]
impl TwitchApi for ScriptedApi {
    async fn get_stream_info(&self, channel: &str) -> Result<StreamInfo, ApiError> {
        let mut script = self.script.lock();
        script.stream_calls.push(channel.to_string());
        if script.fail_streams {
            return Err(unavailable("streams", channel));
        }
        Ok(script.streams.get(channel).cloned().unwrap_or_default())
    }

    async fn get_channel_videos(
        &self,
        channel: &str,
        _broadcasts: bool,
        limit: usize,
    ) -> Result<VideoList, ApiError> {
        let mut script = self.script.lock();
        script.video_calls.push(channel.to_string());
        script.last_video_limit = Some(limit);
        if script.fail_videos {
            return Err(unavailable("videos", channel));
        }
        let videos = script.videos.get(channel).cloned().unwrap_or_default();
        Ok(VideoList {
            videos: Some(videos),
        })
    }

    async fn get_channel_followers(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<FollowList, ApiError> {
        let mut script = self.script.lock();
        script.follower_calls.push(channel.to_string());
        script.last_follower_limit = Some(limit);
        if script.fail_followers {
            return Err(unavailable("follows", channel));
        }
        let mut list = script.followers.get(channel).cloned().unwrap_or(FollowList {
            follows: Some(Vec::new()),
        });
        if let Some(follows) = list.follows.as_mut() {
            follows.truncate(limit);
        }
        Ok(list)
    }
}

/// [`MessageSink`] that keeps every message.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(channel, text)` pairs in send order.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().clone()
    }

    pub fn messages_for(&self, channel: &str) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send_message(&self, channel: &str, text: &str) {
        self.messages
            .lock()
            .push((channel.to_string(), text.to_string()));
    }
}
