//! Error types for tldw.

use serde::Serialize;
use thiserror::Error;

/// Pipeline stage an external call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Metadata,
    Acquisition,
    Transcription,
    Generation,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Metadata => write!(f, "metadata"),
            Stage::Acquisition => write!(f, "acquisition"),
            Stage::Transcription => write!(f, "transcription"),
            Stage::Generation => write!(f, "generation"),
        }
    }
}

/// Library-level error type for tldw operations.
#[derive(Error, Debug)]
pub enum TldwError {
    #[error("Invalid video reference: {0}")]
    InvalidReference(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Media acquisition failed: {0}")]
    Acquisition(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Cache write failed: {0}")]
    CacheWrite(String),

    #[error("Not found in cache: {0}")]
    NotFound(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: Stage, secs: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Client-visible error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidReference,
    InvalidRequest,
    Acquisition,
    Transcription,
    UpstreamService,
    CacheWrite,
    Export,
    NotFound,
    Internal,
}

impl TldwError {
    /// Map the error onto the client-visible taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TldwError::InvalidReference(_) => ErrorKind::InvalidReference,
            TldwError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            TldwError::Acquisition(_) => ErrorKind::Acquisition,
            TldwError::Transcription(_) => ErrorKind::Transcription,
            TldwError::Upstream(_) | TldwError::Http(_) => ErrorKind::UpstreamService,
            TldwError::CacheWrite(_) => ErrorKind::CacheWrite,
            TldwError::NotFound(_) => ErrorKind::NotFound,
            TldwError::Export(_) => ErrorKind::Export,
            TldwError::Timeout { stage, .. } => match stage {
                Stage::Metadata | Stage::Acquisition => ErrorKind::Acquisition,
                Stage::Transcription => ErrorKind::Transcription,
                Stage::Generation => ErrorKind::UpstreamService,
            },
            TldwError::Config(_)
            | TldwError::ToolNotFound(_)
            | TldwError::Io(_)
            | TldwError::Json(_)
            | TldwError::TomlParse(_) => ErrorKind::Internal,
        }
    }

    /// Whether another attempt at the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TldwError::Acquisition(_)
                | TldwError::Transcription(_)
                | TldwError::Upstream(_)
                | TldwError::Timeout { .. }
                | TldwError::Http(_)
        )
    }
}

/// Result type alias for tldw operations.
pub type Result<T> = std::result::Result<T, TldwError>;
