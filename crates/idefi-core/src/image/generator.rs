//! Image generator

use std::sync::Arc;

use super::prompts;
use crate::agent::{Role, Tier};
use crate::error::ExternalError;
use crate::integrations::ImageService;
use crate::tracking::TrackingStore;

/// What a generated image depicts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSubject {
    /// Role artwork; counted in the tracking file
    Role(Role),
    /// Generic artwork for an agent without a role; not counted
    Tier(Tier),
}

impl ImageSubject {
    pub fn prompt(&self) -> String {
        match self {
            ImageSubject::Role(role) => prompts::role_prompt(*role),
            ImageSubject::Tier(tier) => prompts::tier_prompt(*tier),
        }
    }
}

/// Requests one square image per agent and counts created agents
#[derive(Clone)]
pub struct ImageGenerator {
    images: Arc<dyn ImageService>,
    tracking: Arc<TrackingStore>,
    size: String,
}

impl ImageGenerator {
    pub fn new(
        images: Arc<dyn ImageService>,
        tracking: Arc<TrackingStore>,
        size: impl Into<String>,
    ) -> Self {
        Self {
            images,
            tracking,
            size: size.into(),
        }
    }

    pub fn tracking(&self) -> &Arc<TrackingStore> {
        &self.tracking
    }

    /// Generate the image and return its URL
    ///
    /// Nothing is counted here; the caller calls [`record`](Self::record)
    /// once the agent actually exists.
    pub async fn generate(&self, subject: ImageSubject) -> Result<String, ExternalError> {
        let urls = self
            .images
            .generate_images(&subject.prompt(), 1, &self.size)
            .await?;
        let url = urls
            .into_iter()
            .find(|url| !url.is_empty())
            .ok_or_else(|| ExternalError::invalid("OpenAI", "no image URL in response"))?;
        tracing::info!(?subject, %url, "generated agent image");
        Ok(url)
    }

    /// Count a created agent whose image depicts `subject`
    ///
    /// Only role subjects are counted; `multi_role` also bumps the multi-role
    /// counter. A failure to persist the counters is logged, not returned.
    pub async fn record(&self, subject: ImageSubject, multi_role: bool) {
        let ImageSubject::Role(role) = subject else {
            return;
        };
        if let Err(e) = self.tracking.record(role, multi_role).await {
            tracing::warn!(%role, "failed to persist tracking counters: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::fake::FakeImages;
    use tempfile::TempDir;

    fn generator(dir: &TempDir, images: Arc<FakeImages>) -> ImageGenerator {
        let tracking = Arc::new(TrackingStore::open(dir.path().join("tracking.json")).unwrap());
        ImageGenerator::new(images, tracking, "1024x1024")
    }

    #[tokio::test]
    async fn test_role_image_is_counted() {
        let dir = TempDir::new().unwrap();
        let images = Arc::new(FakeImages::default());
        let generator = generator(&dir, images.clone());

        let subject = ImageSubject::Role(Role::Miner);
        let url = generator.generate(subject).await.unwrap();
        assert_eq!(url, "https://images.test/1-0.png");
        assert_eq!(images.prompts()[0], prompts::role_prompt(Role::Miner));
        assert_eq!(generator.tracking().snapshot().await.total_agents, 0);

        generator.record(subject, false).await;
        let counters = generator.tracking().snapshot().await;
        assert_eq!(counters.role_count(Role::Miner), 1);
        assert_eq!(counters.total_agents, 1);
    }

    #[tokio::test]
    async fn test_tier_image_is_not_counted() {
        let dir = TempDir::new().unwrap();
        let generator = generator(&dir, Arc::new(FakeImages::default()));
        let subject = ImageSubject::Tier(Tier::Quantum);
        generator.generate(subject).await.unwrap();
        generator.record(subject, false).await;
        assert_eq!(generator.tracking().snapshot().await.total_agents, 0);
    }

    #[tokio::test]
    async fn test_failure_leaves_counters() {
        let dir = TempDir::new().unwrap();
        let images = Arc::new(FakeImages::default());
        images.set_failing(true);
        let generator = generator(&dir, images);
        let err = generator
            .generate(ImageSubject::Role(Role::Scout))
            .await
            .unwrap_err();
        assert!(matches!(err, ExternalError::Status { status: 500, .. }));
        assert_eq!(generator.tracking().snapshot().await.total_agents, 0);
    }
}
