//! Configuration module for tldw.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, SummaryPrompts, TranslatePrompts, VisionPrompts};
pub use settings::{
    CacheSettings, ExportSettings, GeneralSettings, GenerationSettings, NetworkSettings,
    PromptSettings, RequestLogSettings, ServerSettings, Settings, TranscriptionSettings,
    YoutubeSettings,
};
