//! ImageResolver backed by a fixed url prefix

use crate::core_community::directory::ImageResolver;
use async_trait::async_trait;
use std::collections::HashSet;

/// Joins image references onto a base url
///
/// References marked broken fail to resolve, which lets callers exercise
/// the placeholder fallback.
#[derive(Debug, Clone)]
pub struct StaticImageResolver {
    base_url: String,
    broken: HashSet<String>,
}

impl StaticImageResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            broken: HashSet::new(),
        }
    }

    pub fn with_broken(mut self, image_ref: impl Into<String>) -> Self {
        self.broken.insert(image_ref.into());
        self
    }
}

#[async_trait]
impl ImageResolver for StaticImageResolver {
    async fn resolve(&self, image_ref: &str) -> anyhow::Result<String> {
        if self.broken.contains(image_ref) {
            anyhow::bail!("image {image_ref} is unavailable");
        }
        Ok(format!("{}/{}", self.base_url, image_ref.trim_start_matches('/')))
    }
}
