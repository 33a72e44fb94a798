//! Local storage for downloaded avatar images.

use std::path::PathBuf;

use uuid::Uuid;

use super::DownloadedImage;
use crate::error::AvatarError;

/// Writes images under `<root>/avatars/`.
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    root: PathBuf,
}

impl MediaLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Stores an image under a fresh unique name and returns its path.
    pub async fn store_image(&self, image: &DownloadedImage) -> Result<PathBuf, AvatarError> {
        let dir = self.root.join("avatars");
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("{}.{}", Uuid::new_v4(), image.extension()));
        tokio::fs::write(&path, &image.bytes).await?;

        tracing::debug!(path = %path.display(), bytes = image.bytes.len(), "Avatar stored");
        Ok(path)
    }
}
