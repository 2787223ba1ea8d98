//! Request and response shapes for one pipeline run.

use crate::error::{Result, TldwError};
use crate::export::{FileFormat, OutputKind};
use crate::media::VideoMetadata;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static LANGUAGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(?:-[A-Za-z0-9]{2,8})?$").expect("language pattern is valid")
});

/// Short language code such as `en`, `fr` or `pt-BR`.
///
/// Codes end up in cache filenames, so only letters, digits and a single
/// region separator are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    /// Parse and canonicalize a code: `FR` becomes `fr`, `pt-br` becomes
    /// `pt-BR`, `zh-hant` becomes `zh-Hant`.
    pub fn parse(code: &str) -> Result<Self> {
        let code = code.trim();
        if LANGUAGE_REGEX.is_match(code) {
            Ok(Self(canonicalize(code)))
        } else {
            Err(TldwError::InvalidRequest(format!(
                "Unsupported language code '{}'",
                code
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a configured code.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

fn canonicalize(code: &str) -> String {
    let (primary, subtag) = match code.split_once('-') {
        Some((primary, subtag)) => (primary, Some(subtag)),
        None => (code, None),
    };

    let mut out = primary.to_ascii_lowercase();
    if let Some(subtag) = subtag {
        out.push('-');
        match subtag.len() {
            2 | 3 => out.push_str(&subtag.to_ascii_uppercase()),
            4 => {
                out.push_str(&subtag[..1].to_ascii_uppercase());
                out.push_str(&subtag[1..].to_ascii_lowercase());
            }
            _ => out.push_str(&subtag.to_ascii_lowercase()),
        }
    }
    out
}

impl TryFrom<String> for Language {
    type Error = TldwError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.0
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which texts the caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    Transcript,
    Summary,
    #[default]
    Both,
}

impl OutputType {
    pub fn kinds(self) -> &'static [OutputKind] {
        match self {
            OutputType::Transcript => &[OutputKind::Transcript],
            OutputType::Summary => &[OutputKind::Summary],
            OutputType::Both => &[OutputKind::Transcript, OutputKind::Summary],
        }
    }

    pub fn wants_transcript(self) -> bool {
        self.kinds().contains(&OutputKind::Transcript)
    }

    pub fn wants_summary(self) -> bool {
        self.kinds().contains(&OutputKind::Summary)
    }
}

impl std::fmt::Display for OutputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputType::Transcript => write!(f, "transcript"),
            OutputType::Summary => write!(f, "summary"),
            OutputType::Both => write!(f, "both"),
        }
    }
}

/// Which export file formats the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Txt,
    Pdf,
    #[default]
    Both,
}

impl FileType {
    pub fn formats(self) -> &'static [FileFormat] {
        match self {
            FileType::Txt => &[FileFormat::Text],
            FileType::Pdf => &[FileFormat::Pdf],
            FileType::Both => &[FileFormat::Text, FileFormat::Pdf],
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileType::Txt => write!(f, "txt"),
            FileType::Pdf => write!(f, "pdf"),
            FileType::Both => write!(f, "both"),
        }
    }
}

/// One call's worth of input.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// URL or bare video ID, unvalidated.
    pub reference: String,
    pub output_type: OutputType,
    /// Language code, unvalidated.
    pub language: String,
    pub file_type: FileType,
}

impl RequestSpec {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            output_type: OutputType::default(),
            language: "en".to_string(),
            file_type: FileType::default(),
        }
    }

    pub fn with_output_type(mut self, output_type: OutputType) -> Self {
        self.output_type = output_type;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_file_type(mut self, file_type: FileType) -> Self {
        self.file_type = file_type;
        self
    }
}

/// Assembled result of one call. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub summary: Option<String>,
    pub metadata: VideoMetadata,
    pub download_links: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes() {
        for ok in ["en", "fr", "ceb", "pt-BR", "zh-Hant"] {
            assert!(Language::parse(ok).is_ok(), "{}", ok);
        }
        for bad in ["", "e", "english", "../etc", "en_US", "fr-", "de/x"] {
            assert!(
                matches!(Language::parse(bad), Err(TldwError::InvalidRequest(_))),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_language_case_is_canonical() {
        let cases = [
            ("FR", "fr"),
            (" En ", "en"),
            ("pt-br", "pt-BR"),
            ("PT-BR", "pt-BR"),
            ("zh-HANT", "zh-Hant"),
            ("es-419", "es-419"),
        ];
        for (input, expected) in cases {
            assert_eq!(Language::parse(input).unwrap().as_str(), expected, "{}", input);
        }
        assert_eq!(Language::parse("FR").unwrap(), Language::parse("fr").unwrap());
    }

    #[test]
    fn test_language_deserialize_validates() {
        let ok: Language = serde_json::from_str("\"de\"").unwrap();
        assert_eq!(ok.as_str(), "de");
        assert!(serde_json::from_str::<Language>("\"../../x\"").is_err());
    }

    #[test]
    fn test_output_type_kinds() {
        assert!(OutputType::Both.wants_transcript() && OutputType::Both.wants_summary());
        assert!(!OutputType::Summary.wants_transcript());
        assert!(!OutputType::Transcript.wants_summary());
    }

    #[test]
    fn test_form_values_deserialize() {
        let output: OutputType = serde_json::from_str("\"summary\"").unwrap();
        let file: FileType = serde_json::from_str("\"pdf\"").unwrap();
        assert_eq!(output, OutputType::Summary);
        assert_eq!(file.formats(), &[FileFormat::Pdf]);
    }

    #[test]
    fn test_payload_omits_missing_texts() {
        let payload = ResponsePayload {
            transcript: None,
            summary: Some("short".into()),
            metadata: VideoMetadata::from_info_json(
                &serde_json::json!({}),
                &crate::media::VideoId::parse("AAAAAAAAAAA").unwrap(),
            ),
            download_links: vec![],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("transcript").is_none());
        assert_eq!(json["summary"], "short");
        assert_eq!(json["metadata"]["video_url"], "https://www.youtube.com/watch?v=AAAAAAAAAAA");
    }
}
