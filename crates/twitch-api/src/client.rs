//! HTTP client for the Kraken-style Twitch endpoints.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::ApiError;
use crate::models::{FollowList, StreamInfo, VideoList};

/// Public web client id used when no application id is configured.
pub const DEFAULT_CLIENT_ID: &str = "kimne78kx3ncx6brgo4mv6wki5h1ko";

pub const DEFAULT_BASE_URL: &str = "https://api.twitch.tv/kraken";

const ACCEPT_V5: &str = "application/vnd.twitchtv.v5+json";

/// Read-only view of the remote service.
///
/// Every method takes the channel login (no leading `#`). Implementations
/// return parsed bodies; interpreting missing fields is left to callers.
#[async_trait]
pub trait TwitchApi: Send + Sync {
    /// Current stream of a channel.
    async fn get_stream_info(&self, channel: &str) -> Result<StreamInfo, ApiError>;

    /// Most recent videos of a channel, newest first.
    async fn get_channel_videos(
        &self,
        channel: &str,
        broadcasts: bool,
        limit: usize,
    ) -> Result<VideoList, ApiError>;

    /// Most recent followers of a channel, newest first.
    async fn get_channel_followers(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<FollowList, ApiError>;
}

/// Strip the IRC-style `#` prefix from a channel id.
pub fn channel_login(channel_id: &str) -> &str {
    channel_id.strip_prefix('#').unwrap_or(channel_id)
}

#[derive(Debug, Clone)]
pub struct KrakenConfig {
    pub base_url: String,
    pub client_id: String,
    pub oauth_token: Option<String>,
    /// Zero disables the client-side timeout.
    pub request_timeout: Duration,
}

impl Default for KrakenConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            oauth_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Install the aws-lc-rs rustls provider once per process.
///
/// reqwest is built without a default provider, so this must run before any
/// `reqwest::Client` is constructed. [`KrakenClient::new`] calls it.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate installed one first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// [`TwitchApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct KrakenClient {
    client: Client,
    base_url: Url,
}

impl KrakenClient {
    pub fn new(config: &KrakenConfig) -> Result<Self, ApiError> {
        install_rustls_provider();

        let base_url =
            Url::parse(&config.base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }

        let mut builder = Client::builder().default_headers(Self::headers(config));
        if config.request_timeout > Duration::ZERO {
            builder = builder.timeout(config.request_timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    /// Create a client around an existing reqwest client.
    ///
    /// Call [`install_rustls_provider`] before building `client`.
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    fn headers(config: &KrakenConfig) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_V5));
        match HeaderValue::from_str(&config.client_id) {
            Ok(value) => {
                headers.insert("Client-Id", value);
            }
            Err(e) => debug!(error = %e, "Invalid client id; skipping header"),
        }
        if let Some(token) = &config.oauth_token {
            match HeaderValue::from_str(&format!("OAuth {token}")) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(e) => debug!(error = %e, "Invalid oauth token; skipping header"),
            }
        }
        headers
    }

    /// Build `<base>/<segments...>?<query>`.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!(%url, "GET");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await?;
        trace!("body: {}", body);
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl TwitchApi for KrakenClient {
    async fn get_stream_info(&self, channel: &str) -> Result<StreamInfo, ApiError> {
        let url = self.endpoint(&["streams", channel], &[])?;
        self.get_json(url).await
    }

    async fn get_channel_videos(
        &self,
        channel: &str,
        broadcasts: bool,
        limit: usize,
    ) -> Result<VideoList, ApiError> {
        let url = self.endpoint(
            &["channels", channel, "videos"],
            &[
                ("broadcasts", broadcasts.to_string()),
                ("limit", limit.to_string()),
            ],
        )?;
        self.get_json(url).await
    }

    async fn get_channel_followers(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<FollowList, ApiError> {
        let url = self.endpoint(
            &["channels", channel, "follows"],
            &[("limit", limit.to_string())],
        )?;
        self.get_json(url).await
    }
}
