//! Generative text: summaries, translation and thumbnail analysis.
//!
//! All three sit on a [`TextGenerator`], the single seam to the upstream
//! generative API, so each can be exercised against a stub.

mod openai;
mod summarize;
mod tokens;
mod translate;
mod vision;

pub use openai::OpenAIGenerator;
pub use summarize::ChunkedSummarizer;
pub use tokens::{TextPiece, TokenChunk, Tokenizer};
pub use translate::LlmTranslator;
pub use vision::VisionAnalyzer;

use crate::error::Result;
use async_trait::async_trait;

/// Single-request access to a generative model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete a text prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Answer a prompt about the image at `image_url`.
    async fn describe_image(&self, image_url: &str, prompt: &str) -> Result<String>;
}

/// Condenses long text into a summary with key points.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        text: &str,
        language: &str,
        visual_context: Option<&str>,
    ) -> Result<String>;
}

/// Translates text into a target language.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, language: &str) -> Result<String>;
}

/// Describes a thumbnail image for summary enrichment.
#[async_trait]
pub trait ThumbnailAnalyzer: Send + Sync {
    async fn analyze(&self, thumbnail_url: &str) -> Result<String>;
}
