//! Local audio artifacts and ffmpeg helpers.

use super::VideoMetadata;
use crate::error::{Result, TldwError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// A downloaded audio file inside its own temporary directory.
///
/// The directory is removed when the value is dropped, including when the
/// request holding it is cancelled or times out.
#[derive(Debug)]
pub struct AcquiredAudio {
    pub path: PathBuf,
    /// Metadata reported alongside the download.
    pub metadata: VideoMetadata,
    dir: TempDir,
}

impl AcquiredAudio {
    /// Wrap `path`, which must live inside `dir`.
    pub fn new(dir: TempDir, path: PathBuf, metadata: VideoMetadata) -> Self {
        Self { path, metadata, dir }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the audio and its directory now. Failures are logged, not returned.
    pub async fn discard(self) {
        let dir = self.dir.path().to_path_buf();
        match tokio::task::spawn_blocking(move || self.dir.close()).await {
            Ok(Ok(())) => debug!("Deleted audio directory {}", dir.display()),
            Ok(Err(e)) => warn!("Failed to delete audio directory {}: {}", dir.display(), e),
            Err(e) => warn!("Audio cleanup task failed for {}: {}", dir.display(), e),
        }
    }
}

/// Locates a downloaded audio file by file stem.
pub(crate) fn find_audio_file(dir: &Path, stem: &str) -> Result<PathBuf> {
    for ext in &["mp3", "opus", "m4a", "webm", "ogg"] {
        let candidate = dir.join(format!("{}.{}", stem, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| TldwError::Acquisition(format!("Cannot read directory: {e}")))?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(stem) {
            return Ok(entry.path());
        }
    }

    Err(TldwError::Acquisition("Audio file not found after download".into()))
}

/// Converts an audio file to MP3 using ffmpeg.
pub(crate) async fn normalize_to_mp3(source: &Path, dest: &Path) -> Result<()> {
    debug!("Converting {:?} to MP3", source);

    let result = Command::new("ffmpeg")
        .arg("-i").arg(source)
        .arg("-vn")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("2")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(TldwError::Acquisition(format!("ffmpeg conversion failed: {err}")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TldwError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(TldwError::Acquisition(format!("ffmpeg error: {e}"))),
    }
}

/// Segments a long audio file into smaller chunks for upload.
///
/// Each chunk will be approximately `chunk_seconds` long. Returns the segment
/// paths in playback order; short audio yields the source path alone.
#[instrument(skip_all)]
pub async fn split_audio(source: &Path, output_dir: &Path, chunk_seconds: u32) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| TldwError::Transcription(format!("Cannot create segment directory: {e}")))?;

    let total_duration = media_duration(source).await?;
    info!("Total audio duration: {:.1}s", total_duration);

    let chunk_len = chunk_seconds.max(1) as f64;

    if total_duration <= chunk_len {
        return Ok(vec![source.to_path_buf()]);
    }

    let base_name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");

    let mut segments = Vec::new();
    let mut offset = 0.0;
    let mut idx = 0u32;

    while offset < total_duration {
        let segment_path = output_dir.join(format!("{}_{:04}.mp3", base_name, idx));
        let segment_len = chunk_len.min(total_duration - offset);

        extract_segment(source, &segment_path, offset, segment_len).await?;

        debug!("Created segment {} at offset {:.1}s", idx, offset);
        segments.push(segment_path);

        offset += chunk_len;
        idx += 1;
    }

    info!("Created {} audio segments", segments.len());
    Ok(segments)
}

/// Extracts a time segment from an audio file.
async fn extract_segment(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    // Stream copy first; it is lossless and fast
    let copy_result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-c").arg("copy")
        .arg("-y")
        .arg("-loglevel").arg("warning")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await;

    if let Ok(status) = copy_result {
        if status.success() && dest.exists() {
            return Ok(());
        }
    }

    warn!("Stream copy failed, re-encoding segment");

    let encode_result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("2")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await;

    match encode_result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(TldwError::Transcription(format!("Segment extraction failed: {err}")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TldwError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(TldwError::Transcription(format!("ffmpeg error: {e}"))),
    }
}

/// Queries the duration of an audio file using ffprobe with JSON output.
async fn media_duration(path: &Path) -> Result<f64> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TldwError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(TldwError::Transcription(format!("ffprobe failed: {e}")));
        }
    };

    if !output.status.success() {
        return Err(TldwError::Transcription("ffprobe returned error".into()));
    }

    parse_duration_output(&output.stdout)
}

fn parse_duration_output(stdout: &[u8]) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|_| TldwError::Transcription("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| TldwError::Transcription("Could not determine audio duration".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> VideoMetadata {
        VideoMetadata {
            title: "t".into(),
            uploader: None,
            upload_date: None,
            duration: 10,
            view_count: None,
            like_count: None,
            video_url: "https://www.youtube.com/watch?v=AAAAAAAAAAA".into(),
            thumbnail_url: None,
        }
    }

    #[test]
    fn test_find_audio_file_prefers_known_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc-1.webm"), b"x").unwrap();
        std::fs::write(dir.path().join("abc-1.mp3"), b"x").unwrap();

        let found = find_audio_file(dir.path(), "abc-1").unwrap();
        assert_eq!(found, dir.path().join("abc-1.mp3"));
    }

    #[test]
    fn test_find_audio_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_audio_file(dir.path(), "nothing").unwrap_err();
        assert!(matches!(err, TldwError::Acquisition(_)));
    }

    #[tokio::test]
    async fn test_discard_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir_in(root.path()).unwrap();
        let path = dir.path().join("a.mp3");
        std::fs::write(&path, b"x").unwrap();

        let audio = AcquiredAudio::new(dir, path.clone(), sample_metadata());
        let audio_dir = audio.dir().to_path_buf();
        audio.discard().await;

        assert!(!path.exists());
        assert!(!audio_dir.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir_in(root.path()).unwrap();
        let path = dir.path().join("a.mp3");
        std::fs::write(&path, b"x").unwrap();

        drop(AcquiredAudio::new(dir, path, sample_metadata()));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_parse_duration_output() {
        let out = br#"{"format": {"duration": "123.456"}}"#;
        assert!((parse_duration_output(out).unwrap() - 123.456).abs() < 1e-9);
        assert!(parse_duration_output(b"{}").is_err());
    }
}
