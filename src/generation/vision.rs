//! Thumbnail analysis.

use super::{TextGenerator, ThumbnailAnalyzer};
use crate::config::Prompts;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// Describes thumbnails with the generator's vision model.
pub struct VisionAnalyzer {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<Prompts>,
}

impl VisionAnalyzer {
    pub fn new(generator: Arc<dyn TextGenerator>, prompts: Arc<Prompts>) -> Self {
        Self { generator, prompts }
    }
}

#[async_trait]
impl ThumbnailAnalyzer for VisionAnalyzer {
    #[instrument(skip(self))]
    async fn analyze(&self, thumbnail_url: &str) -> Result<String> {
        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.vision.user, &HashMap::new());
        self.generator.describe_image(thumbnail_url, &prompt).await
    }
}
