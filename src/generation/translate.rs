//! Generative translation.

use super::{TextGenerator, Tokenizer, Translator};
use crate::config::Prompts;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Translates through the generative API, a few whole sentences at a time.
pub struct LlmTranslator {
    generator: Arc<dyn TextGenerator>,
    tokenizer: Arc<Tokenizer>,
    prompts: Arc<Prompts>,
    max_chunk_tokens: usize,
}

impl LlmTranslator {
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
}

#[async_trait]
impl Translator for LlmTranslator {
    #[instrument(skip(self, text), fields(text_chars = text.len()))]
    async fn translate(&self, text: &str, language: &str) -> Result<String> {
        let pieces = self.tokenizer.pack_sentences(text, self.max_chunk_tokens)?;
        let mut translated = String::with_capacity(text.len());

        for (i, piece) in pieces.iter().enumerate() {
            if !piece.text.trim().is_empty() {
                let mut vars = HashMap::new();
                vars.insert("language".to_string(), language.to_string());
                vars.insert("text".to_string(), piece.text.clone());
                let prompt = self
                    .prompts
                    .render_with_custom(&self.prompts.translate.user, &vars);

                let output = self.generator.generate(&prompt).await?;
                translated.push_str(output.trim());
                debug!("Translated piece {}/{}", i + 1, pieces.len());
            }
            translated.push_str(&piece.separator);
        }

        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EchoGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            Ok(format!("[{}]", prompts.len()))
        }

        async fn describe_image(&self, _image_url: &str, _prompt: &str) -> Result<String> {
            unreachable!()
        }
    }

    fn translator(generator: Arc<EchoGenerator>, max_tokens: usize) -> LlmTranslator {
        LlmTranslator::new(
            generator,
            Arc::new(Tokenizer::cl100k().unwrap()),
            Arc::new(Prompts::default()),
            max_tokens,
        )
    }

    #[tokio::test]
    async fn test_short_text_is_one_request() {
        let generator = Arc::new(EchoGenerator::default());
        let out = translator(generator.clone(), 3000)
            .translate("Hello there", "fr")
            .await
            .unwrap();

        assert_eq!(out, "[1]");
        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("into fr"));
        assert!(prompts[0].contains("Hello there"));
    }

    #[tokio::test]
    async fn test_long_text_is_translated_in_order() {
        let generator = Arc::new(EchoGenerator::default());
        let text = "One sentence about rivers. ".repeat(20);
        let out = translator(generator.clone(), 20)
            .translate(text.trim_end(), "de")
            .await
            .unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts.len() > 1);
        let expected: Vec<String> = (1..=prompts.len()).map(|i| format!("[{}]", i)).collect();
        assert_eq!(out, expected.join(" "));
    }

    #[tokio::test]
    async fn test_pieces_hold_whole_sentences() {
        let generator = Arc::new(EchoGenerator::default());
        let text = "Die Bundesverfassungsgerichtsentscheidung wurde gestern veröffentlicht. ".repeat(50);
        translator(generator.clone(), 60)
            .translate(&text, "en")
            .await
            .unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts.len() > 1);
        for prompt in prompts.iter() {
            let sentences = prompt.matches("Die Bundesverfassungsgerichtsentscheidung").count();
            let endings = prompt.matches("veröffentlicht.").count();
            assert!(sentences > 0);
            assert_eq!(sentences, endings);
        }
    }

    #[tokio::test]
    async fn test_paragraph_breaks_survive() {
        let generator = Arc::new(EchoGenerator::default());
        let out = translator(generator.clone(), 4)
            .translate("First paragraph.\n\nSecond paragraph.", "fr")
            .await
            .unwrap();

        assert_eq!(out, "[1]\n\n[2]");
    }

    #[tokio::test]
    async fn test_empty_text_translates_to_empty() {
        let generator = Arc::new(EchoGenerator::default());
        let out = translator(generator.clone(), 100).translate("", "fr").await.unwrap();
        assert_eq!(out, "");
        assert!(generator.prompts.lock().unwrap().is_empty());
    }
}
