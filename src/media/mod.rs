//! Video identity, metadata and audio acquisition.
//!
//! Provides trait-based interfaces for fetching metadata and acquiring audio,
//! with a yt-dlp backed implementation for YouTube.

mod audio;
mod youtube;

pub use audio::{split_audio, AcquiredAudio};
pub use youtube::YoutubeSource;

use crate::error::{Result, TldwError};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static VIDEO_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    // Matches the supported YouTube URL forms and bare 11-character IDs
    Regex::new(
        r"(?x)
        ^(?:
            (?:https?://)?
            (?:www\.|m\.|music\.)?
            (?:
                youtube\.com/(?:watch\?(?:[^\#]*&)?v=|embed/|v/|shorts/|live/)
                |
                youtu\.be/
            )
            ([a-zA-Z0-9_-]{11})
            (?:[?&\#/].*)?
            |
            ([a-zA-Z0-9_-]{11})
        )$
    ",
    )
    .expect("video id pattern is valid")
});

/// Stable short token identifying a video across requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Extract the video ID from a YouTube URL or bare ID.
    pub fn parse(reference: &str) -> Result<Self> {
        let caps = VIDEO_ID_REGEX.captures(reference.trim()).ok_or_else(|| {
            TldwError::InvalidReference(format!(
                "Could not extract a video ID from '{}'",
                reference
            ))
        })?;

        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| Self(m.as_str().to_string()))
            .ok_or_else(|| TldwError::InvalidReference(reference.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this video.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Descriptive metadata for a video. Fetched fresh on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub uploader: Option<String>,
    /// Upload date as reported by the platform (YYYYMMDD).
    pub upload_date: Option<String>,
    /// Duration in seconds.
    pub duration: u64,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    /// Canonical URL of the video page.
    pub video_url: String,
    pub thumbnail_url: Option<String>,
}

impl VideoMetadata {
    /// Build metadata from a yt-dlp info JSON document.
    pub fn from_info_json(json: &serde_json::Value, id: &VideoId) -> Self {
        let str_field = |key: &str| json[key].as_str().map(|s| s.to_string());

        Self {
            title: str_field("title").unwrap_or_else(|| "Unknown Title".to_string()),
            uploader: str_field("uploader").or_else(|| str_field("channel")),
            upload_date: str_field("upload_date"),
            duration: json["duration"].as_f64().map(|d| d.max(0.0) as u64).unwrap_or(0),
            view_count: json["view_count"].as_u64(),
            like_count: json["like_count"].as_u64(),
            video_url: str_field("webpage_url").unwrap_or_else(|| id.watch_url()),
            thumbnail_url: str_field("thumbnail"),
        }
    }
}

/// Obtains metadata without downloading media.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch_metadata(&self, id: &VideoId) -> Result<VideoMetadata>;
}

/// Produces a local audio file for transcription.
#[async_trait]
pub trait MediaAcquirer: Send + Sync {
    /// Download audio for the video. On failure no partial files are left behind.
    async fn acquire(&self, id: &VideoId) -> Result<AcquiredAudio>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported_forms() {
        let expected = "dQw4w9WgXcQ";
        for input in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
            "youtu.be/dQw4w9WgXcQ",
            "https://youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/live/dQw4w9WgXcQ",
            "  dQw4w9WgXcQ  ",
        ] {
            assert_eq!(VideoId::parse(input).unwrap().as_str(), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_parse_is_deterministic() {
        let url = "https://youtu.be/AAAAAAAAAAA";
        let first = VideoId::parse(url).unwrap();
        let second = VideoId::parse(url).unwrap();
        assert_eq!(first, second);
        assert_eq!(VideoId::parse(first.as_str()).unwrap(), first);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        for input in [
            "",
            "not-a-video-id",
            "https://vimeo.com/123456789",
            "https://youtu.be/short",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQX",
            "https://www.youtube.com/playlist?list=PLtest",
            "/path/to/video.mp4",
        ] {
            let err = VideoId::parse(input).unwrap_err();
            assert!(matches!(err, TldwError::InvalidReference(_)), "input: {}", input);
        }
    }

    #[test]
    fn test_metadata_from_info_json() {
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let json = serde_json::json!({
            "title": "Never Gonna Give You Up",
            "channel": "Rick Astley",
            "upload_date": "20091025",
            "duration": 212.0,
            "view_count": 1_000_000u64,
            "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"
        });

        let metadata = VideoMetadata::from_info_json(&json, &id);
        assert_eq!(metadata.title, "Never Gonna Give You Up");
        assert_eq!(metadata.uploader.as_deref(), Some("Rick Astley"));
        assert_eq!(metadata.duration, 212);
        assert_eq!(metadata.like_count, None);
        assert_eq!(metadata.video_url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }
}
