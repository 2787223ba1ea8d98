//! Chunked summarization.

use super::{Summarizer, TextGenerator, Tokenizer};
use crate::config::Prompts;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Summarizes text of any length within a per-request token limit.
///
/// The text is cut into token-bounded chunks, each chunk is summarized with
/// its position, and one final request merges the partial summaries into a
/// summary with key points.
pub struct ChunkedSummarizer {
    generator: Arc<dyn TextGenerator>,
    tokenizer: Arc<Tokenizer>,
    prompts: Arc<Prompts>,
    max_chunk_tokens: usize,
}

impl ChunkedSummarizer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        tokenizer: Arc<Tokenizer>,
        prompts: Arc<Prompts>,
        max_chunk_tokens: usize,
    ) -> Self {
        Self {
            generator,
            tokenizer,
            prompts,
            max_chunk_tokens,
        }
    }

    fn chunk_prompt(&self, index: usize, count: usize, language: &str, chunk: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("index".to_string(), index.to_string());
        vars.insert("count".to_string(), count.to_string());
        vars.insert("language".to_string(), language.to_string());
        vars.insert("chunk".to_string(), chunk.to_string());
        self.prompts
            .render_with_custom(&self.prompts.summary.chunk, &vars)
    }

    fn final_prompt(&self, language: &str, partials: &[String], visual: Option<&str>) -> String {
        let mut vars = HashMap::new();
        vars.insert("language".to_string(), language.to_string());
        vars.insert("summaries".to_string(), partials.join("\n\n"));
        let mut prompt = self
            .prompts
            .render_with_custom(&self.prompts.summary.consolidate, &vars);

        if let Some(visual) = visual.filter(|v| !v.trim().is_empty()) {
            let mut vars = HashMap::new();
            vars.insert("visual_context".to_string(), visual.to_string());
            prompt.push_str(
                &self
                    .prompts
                    .render_with_custom(&self.prompts.summary.visual_context, &vars),
            );
        }

        prompt
    }
}

#[async_trait]
impl Summarizer for ChunkedSummarizer {
    #[instrument(skip(self, text, visual_context), fields(text_chars = text.len()))]
    async fn summarize(
        &self,
        text: &str,
        language: &str,
        visual_context: Option<&str>,
    ) -> Result<String> {
        let chunks = self.tokenizer.chunk(text, self.max_chunk_tokens)?;
        if chunks.is_empty() {
            debug!("Nothing to summarize");
            return Ok(String::new());
        }

        let count = chunks.len();
        info!("Summarizing {} chunk(s)", count);

        let mut partials = Vec::with_capacity(count);
        for (i, chunk) in chunks.iter().enumerate() {
            let prompt = self.chunk_prompt(i + 1, count, language, &chunk.text);
            let partial = self.generator.generate(&prompt).await?;
            debug!("Chunk {}/{} summarized ({} chars)", i + 1, count, partial.len());
            partials.push(partial);
        }

        let prompt = self.final_prompt(language, &partials, visual_context);
        self.generator.generate(&prompt).await
    }
}
