//! Avatar images for generated accounts.
//!
//! A batch asks the remote avatar service for a pool of image URLs once, then
//! every provisioned account samples one URL from that pool, downloads it and
//! stores it in the local [`MediaLibrary`]. Nothing in here is fatal to a
//! batch: a failed listing yields an empty pool and a failed download leaves
//! the account without an avatar.

pub mod media;
pub mod pool;
pub mod remote;

pub use media::MediaLibrary;
pub use pool::AvatarPool;
pub use remote::{sanitize_url, HttpAvatarSource, API_KEY_HEADER};

use async_trait::async_trait;

use crate::error::AvatarError;

/// Raw image bytes fetched from a pool URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub source_url: String,
}

impl DownloadedImage {
    /// File extension matching the content type.
    pub fn extension(&self) -> &'static str {
        let mime = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => "jpg",
        }
    }
}

/// The remote avatar service.
#[async_trait]
pub trait AvatarSource: Send + Sync {
    /// Requests up to `count` image URLs. Never fails; any problem yields an empty pool.
    async fn fetch_pool(&self, count: usize, api_key: &str) -> AvatarPool;

    /// Downloads one image.
    async fn download(&self, url: &str) -> Result<DownloadedImage, AvatarError>;
}
