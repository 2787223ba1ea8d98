//! OpenAI chat-completions generator.

use super::TextGenerator;
use crate::error::{Result, Stage, TldwError};
use crate::retry::RetryPolicy;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
    ImageUrlArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Chat-completions backed [`TextGenerator`].
///
/// Every request runs under the configured timeout and retry policy.
pub struct OpenAIGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    vision_model: String,
    temperature: f32,
    retry: RetryPolicy,
    timeout: Duration,
}

impl OpenAIGenerator {
    pub fn new(client: Client<OpenAIConfig>, model: &str, vision_model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            vision_model: vision_model.to_string(),
            temperature: 0.3,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(300),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy, timeout: Duration) -> Self {
        self.retry = retry;
        self.timeout = timeout;
        self
    }

    async fn complete(&self, model: &str, message: ChatCompletionRequestMessage) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![message])
            .temperature(self.temperature)
            .build()
            .map_err(|e| TldwError::Upstream(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| TldwError::Upstream(format!("Generation API error: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| TldwError::Upstream("Empty response from model".to_string()))?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl TextGenerator for OpenAIGenerator {
    #[instrument(skip(self, prompt), fields(prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let output = self
            .retry
            .run(Stage::Generation, self.timeout, move || async move {
                let message = ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(|e| TldwError::Upstream(e.to_string()))?;
                self.complete(&self.model, message.into()).await
            })
            .await?;

        debug!("Generated {} chars", output.len());
        Ok(output)
    }

    #[instrument(skip(self, prompt))]
    async fn describe_image(&self, image_url: &str, prompt: &str) -> Result<String> {
        self.retry
            .run(Stage::Generation, self.timeout, move || async move {
                let text_part = ChatCompletionRequestMessageContentPartTextArgs::default()
                    .text(prompt)
                    .build()
                    .map_err(|e| TldwError::Upstream(e.to_string()))?;

                let image_part = ChatCompletionRequestMessageContentPartImageArgs::default()
                    .image_url(
                        ImageUrlArgs::default()
                            .url(image_url)
                            .detail(ImageDetail::Low)
                            .build()
                            .map_err(|e| TldwError::Upstream(e.to_string()))?,
                    )
                    .build()
                    .map_err(|e| TldwError::Upstream(e.to_string()))?;

                let parts: Vec<ChatCompletionRequestUserMessageContentPart> =
                    vec![text_part.into(), image_part.into()];

                let message = ChatCompletionRequestUserMessageArgs::default()
                    .content(parts)
                    .build()
                    .map_err(|e| TldwError::Upstream(e.to_string()))?;

                self.complete(&self.vision_model, message.into()).await
            })
            .await
    }
}
