//! tldw - too long; didn't watch
//!
//! Turns a video URL into a transcript and/or summary, optionally translated,
//! with downloadable text and PDF exports.
//!
//! # Overview
//!
//! Every expensive step (download, transcription, summarization,
//! translation) produces text that is cached on disk per video and
//! language, so repeated requests skip straight to the cached result.
//! Concurrent requests for the same artifact compute it once.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `media` - Video identity, metadata and audio acquisition (yt-dlp)
//! - `transcription` - Speech-to-text with duration/language model tiers
//! - `generation` - Chunked summarization, translation, thumbnail analysis
//! - `cache` - Durable artifact cache and per-key single-flight locks
//! - `export` - Text and PDF export files
//! - `orchestrator` - Pipeline coordination
//! - `retry` - Timeouts and backoff for external calls
//!
//! # Example
//!
//! ```rust,no_run
//! use tldw::config::Settings;
//! use tldw::orchestrator::Orchestrator;
//! use tldw::request::{OutputType, RequestSpec};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings)?;
//!
//!     let spec = RequestSpec::new("https://youtu.be/dQw4w9WgXcQ")
//!         .with_output_type(OutputType::Summary)
//!         .with_language("fr");
//!     let response = orchestrator.process(&spec).await?;
//!     println!("{}", response.summary.unwrap_or_default());
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod generation;
pub mod media;
pub mod openai;
pub mod orchestrator;
pub mod request;
pub mod request_log;
pub mod retry;
pub mod transcription;

pub use error::{Result, TldwError};
