//! Pipeline orchestrator for tldw.
//!
//! Resolves a request into transcript and summary texts, skipping every
//! expensive step whose result is already cached, then exports files.

use crate::cache::{CacheKey, CacheStore, FileCacheStore, KeyedLocks};
use crate::config::{NetworkSettings, Prompts, Settings};
use crate::error::{Result, Stage};
use crate::export::{ExportPlan, ExportTexts, Exporter, PdfFont};
use crate::generation::{
    ChunkedSummarizer, LlmTranslator, OpenAIGenerator, Summarizer, TextGenerator,
    ThumbnailAnalyzer, Tokenizer, Translator, VisionAnalyzer,
};
use crate::media::{MediaAcquirer, MetadataFetcher, VideoId, VideoMetadata, YoutubeSource};
use crate::openai::create_client_with_timeout;
use crate::request::{Language, RequestSpec, ResponsePayload};
use crate::request_log::{RequestLog, RequestRecord};
use crate::retry::RetryPolicy;
use crate::transcription::{TierModels, TierPolicy, Transcriber, WhisperTranscriber};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The collaborators a pipeline run drives.
#[derive(Clone)]
pub struct Components {
    pub fetcher: Arc<dyn MetadataFetcher>,
    pub acquirer: Arc<dyn MediaAcquirer>,
    pub transcriber: Arc<dyn Transcriber>,
    pub summarizer: Arc<dyn Summarizer>,
    pub translator: Arc<dyn Translator>,
    /// Thumbnail analysis is skipped when absent.
    pub thumbnails: Option<Arc<dyn ThumbnailAnalyzer>>,
    pub cache: Arc<dyn CacheStore>,
}

/// The main orchestrator for the tldw pipeline.
pub struct Orchestrator {
    components: Components,
    exporter: Exporter,
    request_log: Option<RequestLog>,
    tier_policy: TierPolicy,
    default_language: String,
    retry: RetryPolicy,
    network: NetworkSettings,
    locks: KeyedLocks<CacheKey>,
}

impl Orchestrator {
    /// Create an orchestrator backed by yt-dlp, OpenAI and the file cache.
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Arc::new(Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?);
        let retry = RetryPolicy::from(&settings.network);

        let temp_dir = settings.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;
        let youtube = Arc::new(YoutubeSource::new(settings.youtube.clone(), &temp_dir));

        let transcriber = Arc::new(WhisperTranscriber::new(
            create_client_with_timeout(settings.network.transcription_timeout())?,
            TierModels::from(&settings.transcription),
            settings.transcription.chunk_duration_seconds,
            settings.transcription.max_concurrent_chunks,
        ));

        let generator: Arc<dyn TextGenerator> = Arc::new(
            OpenAIGenerator::new(
                create_client_with_timeout(settings.network.generation_timeout())?,
                &settings.generation.model,
                &settings.generation.vision_model,
            )
            .with_temperature(settings.generation.temperature)
            .with_retry(retry.clone(), settings.network.generation_timeout()),
        );
        let tokenizer = Arc::new(Tokenizer::cl100k()?);

        let summarizer = Arc::new(ChunkedSummarizer::new(
            generator.clone(),
            tokenizer.clone(),
            prompts.clone(),
            settings.generation.max_chunk_tokens,
        ));
        let translator = Arc::new(LlmTranslator::new(
            generator.clone(),
            tokenizer,
            prompts.clone(),
            settings.generation.translate_chunk_tokens,
        ));
        let thumbnails: Option<Arc<dyn ThumbnailAnalyzer>> = if settings.generation.thumbnail_analysis
        {
            Some(Arc::new(VisionAnalyzer::new(generator, prompts)))
        } else {
            None
        };

        info!(
            "Using {} for generation, caching under {}",
            settings.generation.model,
            settings.cache_dir().display()
        );

        let components = Components {
            fetcher: youtube.clone(),
            acquirer: youtube,
            transcriber,
            summarizer,
            translator,
            thumbnails,
            cache: Arc::new(FileCacheStore::new(settings.cache_dir())),
        };

        Ok(Self::with_components(settings, components))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(settings: &Settings, components: Components) -> Self {
        let request_log = settings
            .request_log
            .enabled
            .then(|| RequestLog::new(settings.request_log_path()));

        Self {
            components,
            exporter: Exporter::new(settings.files_dir(), &settings.export.route_prefix)
                .with_pdf_font(pdf_font(settings)),
            request_log,
            tier_policy: TierPolicy::new(
                settings.transcription.long_video_threshold_seconds,
                settings.general.default_language.clone(),
            ),
            default_language: settings.general.default_language.clone(),
            retry: RetryPolicy::from(&settings.network),
            network: settings.network.clone(),
            locks: KeyedLocks::new(),
        }
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    /// Run one request through the pipeline.
    #[instrument(skip(self, spec), fields(reference = %spec.reference, language = %spec.language))]
    pub async fn process(&self, spec: &RequestSpec) -> Result<ResponsePayload> {
        let video_id = VideoId::parse(&spec.reference)?;
        let language = Language::parse(&spec.language)?;
        let needs_translation = !language.matches(&self.default_language);

        let metadata = self.fetch_metadata(&video_id).await?;
        info!("Processing \"{}\" ({}s)", metadata.title, metadata.duration);

        let transcript = self
            .resolve_transcript(&video_id, &language, &metadata)
            .await?;

        // Filled by the summary path so the transcript is translated at most once
        let mut translated: Option<String> = None;

        let summary = if spec.output_type.wants_summary() {
            Some(
                self.resolve_summary(&video_id, &language, &metadata, &transcript, &mut translated)
                    .await?,
            )
        } else {
            None
        };

        let transcript = if !spec.output_type.wants_transcript() {
            None
        } else if needs_translation {
            match translated {
                Some(text) => Some(text),
                None => Some(
                    self.components
                        .translator
                        .translate(&transcript, language.as_str())
                        .await?,
                ),
            }
        } else {
            Some(transcript)
        };

        let plan = ExportPlan::new(spec.output_type, spec.file_type);
        let texts = ExportTexts {
            title: &metadata.title,
            transcript: transcript.as_deref(),
            summary: summary.as_deref(),
        };
        let download_links = self.exporter.export(&video_id, &plan, &texts).await;
        debug!("Exported {} file(s)", download_links.len());

        if let Some(log) = &self.request_log {
            log.append(&RequestRecord {
                timestamp: chrono::Utc::now(),
                video_id: video_id.to_string(),
                duration: metadata.duration,
                output_type: spec.output_type.to_string(),
                language: language.to_string(),
                file_type: spec.file_type.to_string(),
                video_url: metadata.video_url.clone(),
            })
            .await;
        }

        Ok(ResponsePayload {
            transcript,
            summary,
            metadata,
            download_links,
        })
    }

    async fn fetch_metadata(&self, video_id: &VideoId) -> Result<VideoMetadata> {
        let fetcher = &self.components.fetcher;
        self.retry
            .run(Stage::Metadata, self.network.metadata_timeout(), move || {
                fetcher.fetch_metadata(video_id)
            })
            .await
    }

    /// Cached transcript for (id, language), or acquire and transcribe it.
    async fn resolve_transcript(
        &self,
        video_id: &VideoId,
        language: &Language,
        metadata: &VideoMetadata,
    ) -> Result<String> {
        let key = CacheKey::transcript(video_id, language);
        if let Some(text) = self.cached(&key).await {
            info!("Transcript loaded from cache");
            return Ok(text);
        }

        let _guard = self.locks.lock(&key).await;
        if let Some(text) = self.cached(&key).await {
            info!("Transcript produced by a concurrent request");
            return Ok(text);
        }

        let tier = self.tier_policy.select(language.as_str(), metadata.duration);
        info!("Transcript not cached; acquiring audio (tier: {})", tier);

        let acquirer = &self.components.acquirer;
        let audio = self
            .retry
            .run(Stage::Acquisition, self.network.download_timeout(), move || {
                acquirer.acquire(video_id)
            })
            .await?;

        let transcriber = &self.components.transcriber;
        let audio_path = audio.path.as_path();
        let result = self
            .retry
            .run(
                Stage::Transcription,
                self.network.transcription_timeout(),
                move || transcriber.transcribe(audio_path, tier),
            )
            .await;

        audio.discard().await;
        let text = result?;
        info!("Transcription complete ({} chars)", text.len());

        self.store(&key, &text).await;
        Ok(text)
    }

    /// Cached summary for (id, language), or summarize the transcript.
    async fn resolve_summary(
        &self,
        video_id: &VideoId,
        language: &Language,
        metadata: &VideoMetadata,
        transcript: &str,
        translated: &mut Option<String>,
    ) -> Result<String> {
        let key = CacheKey::summary(video_id, language);
        if let Some(text) = self.cached(&key).await {
            info!("Summary loaded from cache");
            return Ok(text);
        }

        let _guard = self.locks.lock(&key).await;
        if let Some(text) = self.cached(&key).await {
            return Ok(text);
        }

        let source = if language.matches(&self.default_language) {
            transcript
        } else {
            info!("Translating transcript to {} before summarizing", language);
            let text = self
                .components
                .translator
                .translate(transcript, language.as_str())
                .await?;
            translated.insert(text).as_str()
        };

        let visual = self.analyze_thumbnail(metadata).await;
        let summary = self
            .components
            .summarizer
            .summarize(source, language.as_str(), visual.as_deref())
            .await?;

        self.store(&key, &summary).await;
        Ok(summary)
    }

    /// Thumbnail description, if analysis is enabled and succeeds.
    async fn analyze_thumbnail(&self, metadata: &VideoMetadata) -> Option<String> {
        let analyzer = self.components.thumbnails.as_ref()?;
        let url = metadata.thumbnail_url.as_deref()?;

        match analyzer.analyze(url).await {
            Ok(description) => Some(description),
            Err(e) => {
                warn!("Thumbnail analysis failed, continuing without it: {}", e);
                None
            }
        }
    }

    async fn cached(&self, key: &CacheKey) -> Option<String> {
        if !self.components.cache.exists(key).await {
            return None;
        }
        match self.components.cache.read(key).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn store(&self, key: &CacheKey, text: &str) {
        if let Err(e) = self.components.cache.write(key, text).await {
            warn!("Failed to cache {}: {}", key, e);
        }
    }
}

/// The configured PDF font, or the bundled one when none is set or it
/// cannot be read.
fn pdf_font(settings: &Settings) -> PdfFont {
    let Some(path) = settings.pdf_font_path() else {
        return PdfFont::bundled();
    };
    PdfFont::load(&path).unwrap_or_else(|e| {
        warn!("{}; falling back to the bundled font", e);
        PdfFont::bundled()
    })
}
