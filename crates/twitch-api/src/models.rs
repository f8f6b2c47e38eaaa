//! Response models for the stream, video and follower endpoints.
//!
//! Leaf fields are optional and tolerate non-string values, so a malformed
//! entry is reported through the accessor methods as a named missing field
//! rather than failing the whole body.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ApiError;
use crate::time::parse_timestamp;

/// Body of `GET /streams/{channel}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamInfo {
    /// Present only while the channel is broadcasting.
    #[serde(default)]
    pub stream: Option<Stream>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Stream {
    #[serde(default, deserialize_with = "string_or_none")]
    pub created_at: Option<String>,
}

impl StreamInfo {
    /// Start time of the current broadcast.
    ///
    /// `Ok(None)` means the API reported no stream at all. A stream object
    /// without a usable `created_at` is an error.
    pub fn started_at(&self) -> Result<Option<DateTime<Utc>>, ApiError> {
        let Some(stream) = &self.stream else {
            return Ok(None);
        };
        let created_at = stream
            .created_at
            .as_deref()
            .ok_or(ApiError::MissingField("stream.created_at"))?;
        parse_timestamp(created_at).map(Some)
    }
}

/// Body of `GET /channels/{channel}/videos`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoList {
    #[serde(default)]
    pub videos: Option<Vec<Video>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Video {
    #[serde(default, deserialize_with = "string_or_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub url: Option<String>,
}

impl VideoList {
    pub fn videos(&self) -> Result<&[Video], ApiError> {
        self.videos
            .as_deref()
            .ok_or(ApiError::MissingField("videos"))
    }
}

impl Video {
    pub fn status(&self) -> Result<&str, ApiError> {
        self.status
            .as_deref()
            .ok_or(ApiError::MissingField("videos[].status"))
    }

    pub fn url(&self) -> Result<&str, ApiError> {
        self.url.as_deref().ok_or(ApiError::MissingField("videos[].url"))
    }

    pub fn is_recording(&self) -> Result<bool, ApiError> {
        Ok(self.status()? == "recording")
    }
}

/// Body of `GET /channels/{channel}/follows`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FollowList {
    #[serde(default)]
    pub follows: Option<Vec<Follow>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Follow {
    #[serde(default, deserialize_with = "string_or_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub user: Option<FollowUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FollowUser {
    #[serde(default, deserialize_with = "string_or_none")]
    pub display_name: Option<String>,
}

impl FollowList {
    pub fn follows(&self) -> Result<&[Follow], ApiError> {
        self.follows
            .as_deref()
            .ok_or(ApiError::MissingField("follows"))
    }
}

impl Follow {
    pub fn created_at(&self) -> Result<DateTime<Utc>, ApiError> {
        let raw = self
            .created_at
            .as_deref()
            .ok_or(ApiError::MissingField("follows[].created_at"))?;
        parse_timestamp(raw)
    }

    pub fn display_name(&self) -> Result<&str, ApiError> {
        self.user
            .as_ref()
            .and_then(|user| user.display_name.as_deref())
            .ok_or(ApiError::MissingField("follows[].user.display_name"))
    }
}

/// Accepts a JSON string, mapping any other value (number, object, null) to `None`.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stream_info_live() {
        let info: StreamInfo =
            serde_json::from_str(r#"{"stream":{"created_at":"2024-01-01T10:00:00Z","game":"x"}}"#)
                .unwrap();
        assert_eq!(
            info.started_at().unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_stream_info_offline() {
        let info: StreamInfo = serde_json::from_str(r#"{"stream":null}"#).unwrap();
        assert_eq!(info.started_at().unwrap(), None);

        let info: StreamInfo = serde_json::from_str("{}").unwrap();
        assert_eq!(info.started_at().unwrap(), None);
    }

    #[test]
    fn test_stream_without_created_at() {
        let info: StreamInfo = serde_json::from_str(r#"{"stream":{"created_at":42}}"#).unwrap();
        assert!(matches!(
            info.started_at(),
            Err(ApiError::MissingField("stream.created_at"))
        ));
    }

    #[test]
    fn test_video_fields() {
        let list: VideoList = serde_json::from_str(
            r#"{"videos":[{"status":"recording","url":"https://www.twitch.tv/videos/1"},{"url":"x"}]}"#,
        )
        .unwrap();
        let videos = list.videos().unwrap();
        assert!(videos[0].is_recording().unwrap());
        assert_eq!(videos[0].url().unwrap(), "https://www.twitch.tv/videos/1");
        assert!(matches!(
            videos[1].status(),
            Err(ApiError::MissingField("videos[].status"))
        ));

        let empty: VideoList = serde_json::from_str("{}").unwrap();
        assert!(matches!(empty.videos(), Err(ApiError::MissingField("videos"))));
    }

    #[test]
    fn test_follow_fields() {
        let list: FollowList = serde_json::from_str(
            r#"{"follows":[
                {"created_at":"2024-01-01T10:00:10Z","user":{"display_name":"Alice"}},
                {"created_at":"2024-01-01T10:00:20Z","user":{}}
            ]}"#,
        )
        .unwrap();
        let follows = list.follows().unwrap();
        assert_eq!(follows[0].display_name().unwrap(), "Alice");
        assert_eq!(
            follows[0].created_at().unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 10).unwrap()
        );
        assert!(matches!(
            follows[1].display_name(),
            Err(ApiError::MissingField("follows[].user.display_name"))
        ));
    }
}
