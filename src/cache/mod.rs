//! Durable text artifact cache.
//!
//! Transcripts and summaries are stored as one text file per
//! (kind, video, language), under `transcripts/` and `summaries/`.

mod singleflight;

pub use singleflight::{KeyGuard, KeyedLocks};

use crate::error::{Result, TldwError};
use crate::media::VideoId;
use crate::request::Language;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Category of cached text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Transcript,
    Summary,
}

impl ArtifactKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            ArtifactKind::Transcript => "transcripts",
            ArtifactKind::Summary => "summaries",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Transcript => write!(f, "transcript"),
            ArtifactKind::Summary => write!(f, "summary"),
        }
    }
}

/// Identity of one cached artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: ArtifactKind,
    pub video_id: VideoId,
    pub language: Language,
}

impl CacheKey {
    pub fn new(kind: ArtifactKind, video_id: &VideoId, language: &Language) -> Self {
        Self {
            kind,
            video_id: video_id.clone(),
            language: language.clone(),
        }
    }

    pub fn transcript(video_id: &VideoId, language: &Language) -> Self {
        Self::new(ArtifactKind::Transcript, video_id, language)
    }

    pub fn summary(video_id: &VideoId, language: &Language) -> Self {
        Self::new(ArtifactKind::Summary, video_id, language)
    }

    pub fn file_name(&self) -> String {
        format!("{}_{}.txt", self.video_id, self.language)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.video_id, self.language)
    }
}

/// Storage for computed artifacts. Artifacts are never invalidated.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn exists(&self, key: &CacheKey) -> bool;

    /// Fails with `NotFound` when the key was never written.
    async fn read(&self, key: &CacheKey) -> Result<String>;

    /// Full overwrite. Fails with `CacheWrite` on I/O errors.
    async fn write(&self, key: &CacheKey, text: &str) -> Result<()>;
}

/// Filesystem-backed cache rooted at a directory.
pub struct FileCacheStore {
    root: PathBuf,
}

impl FileCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.kind.dir_name()).join(key.file_name())
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn exists(&self, key: &CacheKey) -> bool {
        tokio::fs::try_exists(self.path_for(key))
            .await
            .unwrap_or(false)
    }

    async fn read(&self, key: &CacheKey) -> Result<String> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TldwError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &CacheKey, text: &str) -> Result<()> {
        let path = self.path_for(key);
        let dir = self.root.join(key.kind.dir_name());
        let to_cache_err = |e: std::io::Error| TldwError::CacheWrite(format!("{}: {}", key, e));

        tokio::fs::create_dir_all(&dir).await.map_err(to_cache_err)?;

        // Readers only ever see complete files
        let tmp = dir.join(format!(".{}.{}.tmp", key.file_name(), uuid::Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&tmp, text).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(to_cache_err(e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(to_cache_err(e));
        }

        debug!("Cached {} at {}", key, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(kind: ArtifactKind, lang: &str) -> CacheKey {
        CacheKey::new(
            kind,
            &VideoId::parse("AAAAAAAAAAA").unwrap(),
            &Language::parse(lang).unwrap(),
        )
    }

    #[test]
    fn test_layout() {
        let store = FileCacheStore::new("/cache");
        assert_eq!(
            store.path_for(&key(ArtifactKind::Transcript, "en")),
            PathBuf::from("/cache/transcripts/AAAAAAAAAAA_en.txt")
        );
        assert_eq!(
            store.path_for(&key(ArtifactKind::Summary, "fr")),
            PathBuf::from("/cache/summaries/AAAAAAAAAAA_fr.txt")
        );
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path());
        let k = key(ArtifactKind::Transcript, "en");

        assert!(!store.exists(&k).await);
        store.write(&k, "héllo wörld").await.unwrap();
        assert!(store.exists(&k).await);
        assert_eq!(store.read(&k).await.unwrap(), "héllo wörld");
    }

    #[tokio::test]
    async fn test_write_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path());
        let k = key(ArtifactKind::Summary, "en");

        store.write(&k, "first").await.unwrap();
        store.write(&k, "second").await.unwrap();
        assert_eq!(store.read(&k).await.unwrap(), "second");

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("summaries"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path());
        store.write(&key(ArtifactKind::Transcript, "en"), "t").await.unwrap();

        assert!(!store.exists(&key(ArtifactKind::Summary, "en")).await);
        assert!(!store.exists(&key(ArtifactKind::Transcript, "fr")).await);
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path());
        let err = store.read(&key(ArtifactKind::Transcript, "en")).await.unwrap_err();
        assert!(matches!(err, TldwError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unwritable_root_is_cache_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let store = FileCacheStore::new(&blocker);
        let err = store.write(&key(ArtifactKind::Transcript, "en"), "x").await.unwrap_err();
        assert!(matches!(err, TldwError::CacheWrite(_)));
    }
}
