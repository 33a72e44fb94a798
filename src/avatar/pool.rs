//! Batch-scoped pool of candidate avatar URLs.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// Image URLs fetched once per batch and shared read-only by every account in it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvatarPool {
    urls: Vec<String>,
}

impl AvatarPool {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Picks one URL without removing it. `None` when the pool is empty.
    pub fn sample(&self, rng: &mut ChaCha8Rng) -> Option<&str> {
        self.urls.choose(rng).map(String::as_str)
    }
}
