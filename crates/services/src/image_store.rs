//! Cover-image cleanup on the external image host.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::ImageStoreError;

/// Upper bound on one cleanup call, for the HTTP request and for any store.
pub const IMAGE_DELETE_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Remove the hosted image behind `url`.
    async fn delete(&self, url: &str) -> Result<(), ImageStoreError>;
}

/// Used when no image host is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopImageStore;

#[async_trait]
impl ImageStore for NoopImageStore {
    async fn delete(&self, url: &str) -> Result<(), ImageStoreError> {
        tracing::debug!(url, "image host not configured; skipping delete");
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ImageHostConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Deletes images through the host's REST API.
#[derive(Clone)]
pub struct HttpImageStore {
    client: Client,
    config: ImageHostConfig,
}

impl HttpImageStore {
    #[must_use]
    pub fn new(config: ImageHostConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn delete(&self, url: &str) -> Result<(), ImageStoreError> {
        let public_id =
            public_id(url).ok_or_else(|| ImageStoreError::UnrecognizedUrl(url.to_owned()))?;
        let endpoint = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            public_id
        );

        let response = self
            .client
            .delete(endpoint)
            .bearer_auth(&self.config.api_key)
            .timeout(IMAGE_DELETE_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageStoreError::HttpStatus(status));
        }
        tracing::debug!(public_id, "hosted image deleted");
        Ok(())
    }
}

/// Delete `url` from the host on a background task. Failures and timeouts
/// are logged; the caller never waits on the host.
pub(crate) fn discard_in_background(
    images: &Arc<dyn ImageStore>,
    url: Option<String>,
    owner: &'static str,
) {
    let Some(url) = url else { return };
    let images = Arc::clone(images);
    tokio::spawn(async move {
        match tokio::time::timeout(IMAGE_DELETE_TIMEOUT, images.delete(&url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(url, owner, error = %e, "failed to delete image"),
            Err(_) => tracing::warn!(url, owner, "image delete timed out"),
        }
    });
}

/// Public id of a hosted image: the path after `/upload/`, without a
/// leading `v<digits>/` version segment and without the file extension.
#[must_use]
pub fn public_id(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("/upload/")?;
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    let rest = match rest.split_once('/') {
        Some((version, tail))
            if version.len() > 1
                && version.starts_with('v')
                && version[1..].bytes().all(|b| b.is_ascii_digit()) =>
        {
            tail
        }
        _ => rest,
    };
    let file_start = rest.rfind('/').map_or(0, |i| i + 1);
    let id = match rest[file_start..].rfind('.') {
        Some(dot) => &rest[..file_start + dot],
        None => rest,
    };
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_version_and_extension() {
        assert_eq!(
            public_id("https://res.example.com/demo/image/upload/v1712345/events/kickoff.jpg"),
            Some("events/kickoff")
        );
        assert_eq!(
            public_id("https://res.example.com/demo/image/upload/banner.png"),
            Some("banner")
        );
    }

    #[test]
    fn keeps_folders_that_merely_start_with_v() {
        assert_eq!(
            public_id("https://res.example.com/x/upload/videos/cover.webp?w=300"),
            Some("videos/cover")
        );
    }

    #[test]
    fn rejects_urls_without_upload_segment() {
        assert_eq!(public_id("https://example.com/static/cover.jpg"), None);
        assert_eq!(public_id("https://example.com/upload/"), None);
    }

    #[tokio::test]
    async fn noop_store_always_succeeds() {
        assert!(NoopImageStore.delete("anything").await.is_ok());
    }
}
