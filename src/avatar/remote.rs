//! HTTP client for the avatar listing service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;

use super::{AvatarPool, AvatarSource, DownloadedImage};
use crate::error::AvatarError;

/// Header carrying the avatar service API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Keeps only absolute `http`/`https` URLs, normalised by the URL parser.
pub fn sanitize_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url.to_string()),
        _ => None,
    }
}

/// Avatar service reached over HTTP.
///
/// The listing endpoint answers `GET <endpoint>?limit=<n>` with a JSON array of
/// objects whose `photo` field holds an image URL.
pub struct HttpAvatarSource {
    endpoint: Option<String>,
    http_client: Client,
}

impl HttpAvatarSource {
    /// Creates a client with a bounded request timeout.
    ///
    /// With no endpoint configured every pool comes back empty.
    pub fn new(endpoint: Option<String>, timeout: Duration) -> Result<Self, AvatarError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint,
            http_client,
        })
    }

    /// Fetches the listing, surfacing every failure.
    pub async fn try_fetch_pool(
        &self,
        count: usize,
        api_key: &str,
    ) -> Result<AvatarPool, AvatarError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(AvatarPool::empty());
        };

        let mut url =
            Url::parse(endpoint).map_err(|_| AvatarError::InvalidUrl(endpoint.clone()))?;
        url.query_pairs_mut()
            .append_pair("limit", &count.to_string());

        let response = self
            .http_client
            .get(url.clone())
            .header(API_KEY_HEADER, api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AvatarError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body: Value = response.json().await?;
        let entries = body.as_array().ok_or_else(|| {
            AvatarError::MalformedListing("expected a JSON array".to_string())
        })?;

        let urls = entries
            .iter()
            .filter_map(|entry| entry.get("photo").and_then(Value::as_str))
            .filter_map(sanitize_url)
            .take(count)
            .collect();

        Ok(AvatarPool::new(urls))
    }
}

#[async_trait]
impl AvatarSource for HttpAvatarSource {
    async fn fetch_pool(&self, count: usize, api_key: &str) -> AvatarPool {
        if self.endpoint.is_none() {
            tracing::warn!("No avatar API URL configured; accounts will be created without avatars");
            return AvatarPool::empty();
        }

        match self.try_fetch_pool(count, api_key).await {
            Ok(pool) => {
                tracing::info!(requested = count, received = pool.len(), "Avatar pool fetched");
                pool
            }
            Err(e) => {
                tracing::warn!(error = %e, "Avatar listing failed; continuing without avatars");
                AvatarPool::empty()
            }
        }
    }

    async fn download(&self, url: &str) -> Result<DownloadedImage, AvatarError> {
        let parsed = Url::parse(url).map_err(|_| AvatarError::InvalidUrl(url.to_string()))?;
        let response = self.http_client.get(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AvatarError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.trim().to_ascii_lowercase().starts_with("image/") {
            return Err(AvatarError::NotAnImage {
                url: url.to_string(),
                content_type,
            });
        }

        let bytes = response.bytes().await?.to_vec();
        Ok(DownloadedImage {
            bytes,
            content_type,
            source_url: url.to_string(),
        })
    }
}
