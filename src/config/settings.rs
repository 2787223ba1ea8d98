//! Configuration settings for tldw.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub cache: CacheSettings,
    pub export: ExportSettings,
    pub transcription: TranscriptionSettings,
    pub generation: GenerationSettings,
    pub youtube: YoutubeSettings,
    pub network: NetworkSettings,
    pub server: ServerSettings,
    pub request_log: RequestLogSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary audio files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Language transcripts are assumed to be spoken in.
    pub default_language: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.tldw".to_string(),
            temp_dir: "/tmp/tldw".to_string(),
            log_level: "info".to_string(),
            default_language: "en".to_string(),
        }
    }
}

/// Durable artifact cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Root directory; transcripts and summaries live in subdirectories.
    pub dir: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: "~/.tldw/cache".to_string(),
        }
    }
}

/// Export file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Directory export files are written to and served from.
    pub files_dir: String,
    /// URL path prefix the files directory is served under.
    pub route_prefix: String,
    /// TrueType font embedded into PDFs. The bundled DejaVu Sans covers
    /// Latin, Greek and Cyrillic; point this at a CJK font for those scripts.
    pub pdf_font: Option<String>,
    /// Export directories older than this are deleted by the server's
    /// periodic sweep. 0 keeps exports forever.
    pub retention_hours: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            files_dir: "~/.tldw/files".to_string(),
            route_prefix: "/files".to_string(),
            pdf_font: None,
            retention_hours: 24,
        }
    }
}

impl ExportSettings {
    /// `None` when exports are kept forever.
    pub fn retention(&self) -> Option<Duration> {
        (self.retention_hours > 0).then(|| Duration::from_secs(self.retention_hours * 3600))
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Model used for long videos.
    pub fast_model: String,
    /// Model used for short videos in the default language.
    pub balanced_model: String,
    /// Model used for short videos in other languages.
    pub accurate_model: String,
    /// Videos longer than this always use the fast model.
    pub long_video_threshold_seconds: u64,
    /// Duration in seconds for splitting long audio files.
    pub chunk_duration_seconds: u32,
    /// Maximum concurrent chunk uploads.
    pub max_concurrent_chunks: usize,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            fast_model: "whisper-1".to_string(),
            balanced_model: "gpt-4o-mini-transcribe".to_string(),
            accurate_model: "gpt-4o-transcribe".to_string(),
            long_video_threshold_seconds: 900,
            chunk_duration_seconds: 600,
            max_concurrent_chunks: 3,
        }
    }
}

/// Generative text settings (summaries, translation, thumbnails).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Chat model for summaries and translation.
    pub model: String,
    /// Vision-capable model for thumbnail analysis.
    pub vision_model: String,
    /// Maximum tokens per summarization chunk.
    pub max_chunk_tokens: usize,
    /// Maximum tokens per translation chunk.
    pub translate_chunk_tokens: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Enrich summaries with a description of the video thumbnail.
    pub thumbnail_analysis: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            vision_model: "gpt-4o-mini".to_string(),
            max_chunk_tokens: 8000,
            translate_chunk_tokens: 3000,
            temperature: 0.3,
            thumbnail_analysis: true,
        }
    }
}

/// YouTube download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeSettings {
    /// Audio codec yt-dlp extracts to.
    pub audio_format: String,
    /// Audio quality passed to yt-dlp.
    pub audio_quality: String,
    /// SponsorBlock categories cut from the downloaded audio.
    pub sponsorblock_remove: Vec<String>,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            audio_format: "mp3".to_string(),
            audio_quality: "192K".to_string(),
            sponsorblock_remove: ["sponsor", "intro", "outro", "selfpromo"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Timeouts and retry policy for external calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub metadata_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub transcription_timeout_secs: u64,
    pub generation_timeout_secs: u64,
    /// Attempts per call, including the first.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            metadata_timeout_secs: 60,
            download_timeout_secs: 900,
            transcription_timeout_secs: 1800,
            generation_timeout_secs: 300,
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

impl NetworkSettings {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn transcription_timeout(&self) -> Duration {
        Duration::from_secs(self.transcription_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Per-request log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestLogSettings {
    pub enabled: bool,
    /// JSON-lines file requests are appended to.
    pub path: String,
}

impl Default for RequestLogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.tldw/requests.jsonl".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TldwError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tldw")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    pub fn cache_dir(&self) -> PathBuf {
        Self::expand_path(&self.cache.dir)
    }

    pub fn files_dir(&self) -> PathBuf {
        Self::expand_path(&self.export.files_dir)
    }

    pub fn pdf_font_path(&self) -> Option<PathBuf> {
        self.export.pdf_font.as_deref().map(Self::expand_path)
    }

    pub fn request_log_path(&self) -> PathBuf {
        Self::expand_path(&self.request_log.path)
    }
}
