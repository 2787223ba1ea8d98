//! YouTube source implementation backed by yt-dlp.

use super::audio::{find_audio_file, normalize_to_mp3};
use super::{AcquiredAudio, MediaAcquirer, MetadataFetcher, VideoId, VideoMetadata};
use crate::config::YoutubeSettings;
use crate::error::{Result, TldwError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, instrument};

/// YouTube metadata fetcher and audio acquirer.
pub struct YoutubeSource {
    settings: YoutubeSettings,
    download_dir: PathBuf,
}

impl YoutubeSource {
    pub fn new(settings: YoutubeSettings, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            settings,
            download_dir: download_dir.into(),
        }
    }

    /// Arguments for an audio download that also prints the info JSON.
    fn download_args(&self, template: &Path, url: &str) -> Vec<String> {
        let mut args = vec![
            "--format".to_string(),
            "bestaudio/best".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            self.settings.audio_format.clone(),
            "--audio-quality".to_string(),
            self.settings.audio_quality.clone(),
            "--output".to_string(),
            template.to_string_lossy().to_string(),
            "--no-playlist".to_string(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--dump-json".to_string(),
            "--no-simulate".to_string(),
        ];

        if !self.settings.sponsorblock_remove.is_empty() {
            args.push("--sponsorblock-remove".to_string());
            args.push(self.settings.sponsorblock_remove.join(","));
        }

        args.push(url.to_string());
        args
    }

    async fn download(&self, id: &VideoId, dir: &Path, stem: &str) -> Result<(PathBuf, VideoMetadata)> {
        let url = id.watch_url();
        let template = dir.join(format!("{}.%(ext)s", stem));

        info!("Downloading audio from {}", url);

        let result = Command::new("yt-dlp")
            .args(self.download_args(&template, &url))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TldwError::ToolNotFound("yt-dlp".into()));
            }
            Err(e) => {
                return Err(TldwError::Acquisition(format!("yt-dlp execution failed: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TldwError::Acquisition(format!("yt-dlp failed: {stderr}")));
        }

        let metadata = parse_info_line(&output.stdout, id)?;

        let target = dir.join(format!("{}.mp3", stem));
        let downloaded = find_audio_file(dir, stem)?;

        if downloaded != target {
            normalize_to_mp3(&downloaded, &target).await?;
            let _ = tokio::fs::remove_file(&downloaded).await;
        }

        Ok((target, metadata))
    }
}

/// Parses the first JSON document yt-dlp printed to stdout.
fn parse_info_line(stdout: &[u8], id: &VideoId) -> Result<VideoMetadata> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .find(|l| l.trim_start().starts_with('{'))
        .ok_or_else(|| TldwError::Acquisition("yt-dlp printed no metadata".into()))?;

    let json: serde_json::Value = serde_json::from_str(line)
        .map_err(|e| TldwError::Acquisition(format!("Failed to parse yt-dlp output: {}", e)))?;

    Ok(VideoMetadata::from_info_json(&json, id))
}

#[async_trait]
impl MetadataFetcher for YoutubeSource {
    #[instrument(skip(self), fields(video_id = %id))]
    async fn fetch_metadata(&self, id: &VideoId) -> Result<VideoMetadata> {
        let url = id.watch_url();

        let output = Command::new("yt-dlp")
            .args(["--dump-json", "--no-download", "--no-playlist", "--no-warnings", &url])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TldwError::ToolNotFound("yt-dlp".to_string())
                } else {
                    TldwError::Acquisition(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TldwError::Acquisition(format!(
                "Video {} not found or unavailable: {}",
                id, stderr
            )));
        }

        parse_info_line(&output.stdout, id)
    }
}

#[async_trait]
impl MediaAcquirer for YoutubeSource {
    #[instrument(skip(self), fields(video_id = %id))]
    async fn acquire(&self, id: &VideoId) -> Result<AcquiredAudio> {
        tokio::fs::create_dir_all(&self.download_dir).await?;

        // Dropping the directory removes partial downloads on every exit path
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", id))
            .tempdir_in(&self.download_dir)
            .map_err(|e| TldwError::Acquisition(format!("Cannot create download directory: {e}")))?;

        let (path, metadata) = self.download(id, dir.path(), id.as_str()).await?;
        Ok(AcquiredAudio::new(dir, path, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_args_include_sponsorblock() {
        let source = YoutubeSource::new(YoutubeSettings::default(), "/tmp/tldw");
        let args = source.download_args(Path::new("/tmp/tldw/x.%(ext)s"), "https://youtu.be/x");

        let idx = args.iter().position(|a| a == "--sponsorblock-remove").unwrap();
        assert_eq!(args[idx + 1], "sponsor,intro,outro,selfpromo");
        assert_eq!(args.last().unwrap(), "https://youtu.be/x");
        assert!(args.contains(&"--no-simulate".to_string()));
    }

    #[test]
    fn test_download_args_without_sponsorblock() {
        let settings = YoutubeSettings {
            sponsorblock_remove: Vec::new(),
            ..YoutubeSettings::default()
        };
        let source = YoutubeSource::new(settings, "/tmp/tldw");
        let args = source.download_args(Path::new("/tmp/x"), "u");
        assert!(!args.contains(&"--sponsorblock-remove".to_string()));
    }

    #[test]
    fn test_parse_info_line_skips_noise() {
        let id = VideoId::parse("AAAAAAAAAAA").unwrap();
        let stdout = b"[info] something\n{\"title\": \"Demo\", \"duration\": 61}\n";
        let metadata = parse_info_line(stdout, &id).unwrap();
        assert_eq!(metadata.title, "Demo");
        assert_eq!(metadata.duration, 61);
    }

    #[test]
    fn test_parse_info_line_empty() {
        let id = VideoId::parse("AAAAAAAAAAA").unwrap();
        assert!(matches!(parse_info_line(b"", &id), Err(TldwError::Acquisition(_))));
    }
}
