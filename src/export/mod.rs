//! Downloadable export files.
//!
//! Each request writes into its own directory under the files directory,
//! so concurrent requests never overwrite each other's files.

mod pdf;

pub use pdf::{render_pdf, PdfFont};

use crate::error::{Result, TldwError};
use crate::media::VideoId;
use crate::request::{FileType, OutputType};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Which text an export file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Transcript,
    Summary,
}

impl OutputKind {
    pub fn stem(self) -> &'static str {
        match self {
            OutputKind::Transcript => "transcript",
            OutputKind::Summary => "summary",
        }
    }

    fn heading(self) -> &'static str {
        match self {
            OutputKind::Transcript => "Transcript",
            OutputKind::Summary => "Summary",
        }
    }
}

/// On-disk format of an export file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Text,
    Pdf,
}

impl FileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Text => "txt",
            FileFormat::Pdf => "pdf",
        }
    }
}

/// The (output, format) cells a request asks for.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPlan {
    kinds: &'static [OutputKind],
    formats: &'static [FileFormat],
}

impl ExportPlan {
    pub fn new(output_type: OutputType, file_type: FileType) -> Self {
        Self {
            kinds: output_type.kinds(),
            formats: file_type.formats(),
        }
    }

    pub fn cells(&self) -> Vec<(OutputKind, FileFormat)> {
        self.kinds
            .iter()
            .flat_map(|kind| self.formats.iter().map(move |format| (*kind, *format)))
            .collect()
    }
}

/// Texts available for export.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportTexts<'a> {
    pub title: &'a str,
    pub transcript: Option<&'a str>,
    pub summary: Option<&'a str>,
}

impl<'a> ExportTexts<'a> {
    fn get(&self, kind: OutputKind) -> Option<&'a str> {
        match kind {
            OutputKind::Transcript => self.transcript,
            OutputKind::Summary => self.summary,
        }
    }
}

/// Writes export files and builds the links that serve them.
#[derive(Debug, Clone)]
pub struct Exporter {
    files_dir: PathBuf,
    route_prefix: String,
    pdf_font: PdfFont,
}

impl Exporter {
    pub fn new(files_dir: impl Into<PathBuf>, route_prefix: &str) -> Self {
        Self {
            files_dir: files_dir.into(),
            route_prefix: format!("/{}", route_prefix.trim().trim_matches('/')),
            pdf_font: PdfFont::bundled(),
        }
    }

    pub fn with_pdf_font(mut self, font: PdfFont) -> Self {
        self.pdf_font = font;
        self
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    /// Delete request directories last modified at least `max_age` ago,
    /// and video directories left empty. Returns how many request
    /// directories were removed.
    #[instrument(skip(self))]
    pub async fn sweep_expired(&self, max_age: Duration) -> Result<usize> {
        let mut videos = match tokio::fs::read_dir(&self.files_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(video) = videos.next_entry().await? {
            if !video.file_type().await?.is_dir() {
                continue;
            }

            let mut requests = tokio::fs::read_dir(video.path()).await?;
            while let Some(request) = requests.next_entry().await? {
                let modified = request.metadata().await?.modified()?;
                let age = now.duration_since(modified).unwrap_or_default();
                if age < max_age {
                    continue;
                }
                match tokio::fs::remove_dir_all(request.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Failed to remove {}: {}", request.path().display(), e),
                }
            }

            // Fails while the directory still holds live requests
            let _ = tokio::fs::remove_dir(video.path()).await;
        }

        if removed > 0 {
            info!("Removed {} expired export director(ies)", removed);
        }
        Ok(removed)
    }

    /// Write every cell of `plan` that has text, returning one link per
    /// file actually written. A failed cell is logged and left out.
    #[instrument(skip(self, video_id, plan, texts), fields(video_id = %video_id))]
    pub async fn export(
        &self,
        video_id: &VideoId,
        plan: &ExportPlan,
        texts: &ExportTexts<'_>,
    ) -> Vec<String> {
        let token = Uuid::new_v4().to_string();
        let dir = self.files_dir.join(video_id.as_str()).join(&token);
        let mut links = Vec::new();

        for (kind, format) in plan.cells() {
            let Some(text) = texts.get(kind) else {
                debug!("No {} text to export", kind.stem());
                continue;
            };

            let name = format!("{}.{}", kind.stem(), format.extension());
            match self.write_file(&dir, &name, kind, format, texts.title, text).await {
                Ok(()) => links.push(format!(
                    "{}/{}/{}/{}",
                    self.route_prefix, video_id, token, name
                )),
                Err(e) => warn!("Skipping export of {}: {}", name, e),
            }
        }

        links
    }

    async fn write_file(
        &self,
        dir: &Path,
        name: &str,
        kind: OutputKind,
        format: FileFormat,
        title: &str,
        text: &str,
    ) -> Result<()> {
        let to_export_err = |e: std::io::Error| TldwError::Export(format!("{}: {}", name, e));
        tokio::fs::create_dir_all(dir).await.map_err(to_export_err)?;

        let bytes = match format {
            FileFormat::Text => text.as_bytes().to_vec(),
            FileFormat::Pdf => {
                let heading = if title.is_empty() {
                    kind.heading().to_string()
                } else {
                    format!("{}: {}", kind.heading(), title)
                };
                let body = text.to_string();
                let font = self.pdf_font.clone();
                tokio::task::spawn_blocking(move || render_pdf(&heading, &body, &font))
                    .await
                    .map_err(|e| TldwError::Export(format!("PDF task failed: {}", e)))??
            }
        };

        tokio::fs::write(dir.join(name), bytes)
            .await
            .map_err(to_export_err)
    }
}
