//! OpenAI speech-to-text implementation.

use super::{ModelTier, TierModels, Transcriber};
use crate::error::{Result, TldwError};
use crate::media::split_audio;
use async_openai::config::OpenAIConfig;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::Path;
use tracing::{debug, info, instrument};

/// OpenAI transcription client.
///
/// The client is built once and shared by every request; tiers only change
/// the model name sent with each upload.
pub struct WhisperTranscriber {
    client: Client<OpenAIConfig>,
    models: TierModels,
    chunk_duration_seconds: u32,
    max_concurrent_chunks: usize,
}

impl WhisperTranscriber {
    pub fn new(
        client: Client<OpenAIConfig>,
        models: TierModels,
        chunk_duration_seconds: u32,
        max_concurrent_chunks: usize,
    ) -> Self {
        Self {
            client,
            models,
            chunk_duration_seconds,
            max_concurrent_chunks: max_concurrent_chunks.max(1),
        }
    }

    /// Transcribe a single audio file (no splitting).
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_single(&self, audio_path: &Path, model: &str) -> Result<String> {
        debug!("Transcribing audio file with {}", model);

        let file_bytes = tokio::fs::read(audio_path).await.map_err(|e| {
            TldwError::Transcription(format!("Cannot read {}: {}", audio_path.display(), e))
        })?;

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(model)
            .response_format(AudioResponseFormat::Json)
            .build()
            .map_err(|e| TldwError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| TldwError::Transcription(format!("Speech-to-text API error: {}", e)))?;

        Ok(response.text.trim().to_string())
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display(), tier = %tier))]
    async fn transcribe(&self, audio_path: &Path, tier: ModelTier) -> Result<String> {
        let model = self.models.model_for(tier);
        let temp_dir = tempfile::tempdir()
            .map_err(|e| TldwError::Transcription(format!("Cannot create segment directory: {}", e)))?;
        let segments = split_audio(audio_path, temp_dir.path(), self.chunk_duration_seconds).await?;

        if segments.len() == 1 {
            return self.transcribe_single(audio_path, model).await;
        }

        info!("Processing {} audio segments with {}", segments.len(), model);

        let mut results: Vec<(usize, String)> = Vec::with_capacity(segments.len());

        let mut stream = stream::iter(segments.into_iter().enumerate())
            .map(|(idx, path)| async move { (idx, self.transcribe_single(&path, model).await) })
            .buffer_unordered(self.max_concurrent_chunks);

        while let Some((idx, result)) = stream.next().await {
            match result {
                Ok(text) => results.push((idx, text)),
                Err(e) => {
                    return Err(TldwError::Transcription(format!("Segment {} failed: {}", idx, e)));
                }
            }
        }

        results.sort_by_key(|(idx, _)| *idx);

        let text = results
            .into_iter()
            .map(|(_, text)| text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranscriptionSettings;

    fn transcriber() -> WhisperTranscriber {
        WhisperTranscriber::new(
            Client::new(),
            TierModels::from(&TranscriptionSettings::default()),
            600,
            2,
        )
    }

    #[tokio::test]
    async fn test_unreadable_audio_is_transcription_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.mp3");

        let err = transcriber()
            .transcribe_single(&missing, "whisper-1")
            .await
            .unwrap_err();

        assert!(matches!(err, TldwError::Transcription(_)));
        assert!(err.is_retryable());
    }
}
