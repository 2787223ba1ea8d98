//! Speech-to-text transcription.
//!
//! The model used for a transcription is picked per request from the
//! video's duration and the requested language, trading accuracy for
//! latency on long videos.

mod whisper;

pub use whisper::WhisperTranscriber;

use crate::config::TranscriptionSettings;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Speed/accuracy configuration for transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Lowest latency, lowest accuracy.
    Fast,
    Balanced,
    /// Highest accuracy, slowest.
    HighAccuracy,
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelTier::Fast => write!(f, "fast"),
            ModelTier::Balanced => write!(f, "balanced"),
            ModelTier::HighAccuracy => write!(f, "high_accuracy"),
        }
    }
}

/// Chooses a model tier from video duration and target language.
#[derive(Debug, Clone)]
pub struct TierPolicy {
    /// Videos longer than this always get the fast tier.
    pub long_video_threshold_seconds: u64,
    pub default_language: String,
}

impl TierPolicy {
    pub fn new(long_video_threshold_seconds: u64, default_language: impl Into<String>) -> Self {
        Self {
            long_video_threshold_seconds,
            default_language: default_language.into(),
        }
    }

    pub fn select(&self, language: &str, duration_seconds: u64) -> ModelTier {
        if duration_seconds > self.long_video_threshold_seconds {
            ModelTier::Fast
        } else if !language.eq_ignore_ascii_case(&self.default_language) {
            ModelTier::HighAccuracy
        } else {
            ModelTier::Balanced
        }
    }
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self::new(900, "en")
    }
}

/// Model names per tier.
#[derive(Debug, Clone)]
pub struct TierModels {
    pub fast: String,
    pub balanced: String,
    pub high_accuracy: String,
}

impl TierModels {
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::Balanced => &self.balanced,
            ModelTier::HighAccuracy => &self.high_accuracy,
        }
    }
}

impl From<&TranscriptionSettings> for TierModels {
    fn from(settings: &TranscriptionSettings) -> Self {
        Self {
            fast: settings.fast_model.clone(),
            balanced: settings.balanced_model.clone(),
            high_accuracy: settings.accurate_model.clone(),
        }
    }
}

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file to plain text using the given tier.
    async fn transcribe(&self, audio_path: &Path, tier: ModelTier) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_videos_use_fast_tier() {
        let policy = TierPolicy::default();
        assert_eq!(policy.select("en", 1000), ModelTier::Fast);
        assert_eq!(policy.select("fr", 1000), ModelTier::Fast);
    }

    #[test]
    fn test_short_videos_by_language() {
        let policy = TierPolicy::default();
        assert_eq!(policy.select("en", 500), ModelTier::Balanced);
        assert_eq!(policy.select("fr", 500), ModelTier::HighAccuracy);
    }

    #[test]
    fn test_threshold_is_inclusive_of_short() {
        let policy = TierPolicy::default();
        assert_eq!(policy.select("en", 900), ModelTier::Balanced);
        assert_eq!(policy.select("en", 901), ModelTier::Fast);
    }

    #[test]
    fn test_models_from_settings() {
        let models = TierModels::from(&TranscriptionSettings::default());
        assert_eq!(models.model_for(ModelTier::Fast), "whisper-1");
        assert_eq!(models.model_for(ModelTier::HighAccuracy), "gpt-4o-transcribe");
    }
}
