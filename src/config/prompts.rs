//! Prompt templates for tldw.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub summary: SummaryPrompts,
    pub translate: TranslatePrompts,
    pub vision: VisionPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for chunked summarization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryPrompts {
    /// Per-chunk request. Variables: index, count, language, chunk.
    pub chunk: String,
    /// Final consolidation request. Variables: language, summaries.
    pub consolidate: String,
    /// Appended to the consolidation request when a thumbnail description exists.
    /// Variables: visual_context.
    pub visual_context: String,
}

impl Default for SummaryPrompts {
    fn default() -> Self {
        Self {
            chunk: r#"You are reading part {{index}} of {{count}} of a video transcript.
Summarize this part in {{language}}. Earlier and later parts are summarized separately, so do not introduce the video or repeat context a reader of the previous parts already has.

Transcript part {{index}}/{{count}}:
{{chunk}}"#
                .to_string(),

            consolidate: r#"Below are partial summaries of consecutive parts of one video, in order.
Merge them into a single coherent summary in {{language}}. Remove repetition and keep the order of ideas.

{{summaries}}

After the summary, list 5-7 concise key points as bullets, each capturing an important insight or takeaway from the video."#
                .to_string(),

            visual_context: r#"

The video thumbnail was described as follows. Where it adds something, work those observations into the summary:
{{visual_context}}"#
                .to_string(),
        }
    }
}

/// Prompts for translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatePrompts {
    /// Variables: language, text.
    pub user: String,
}

impl Default for TranslatePrompts {
    fn default() -> Self {
        Self {
            user: r#"Translate the following video transcript into {{language}}. Return only the translation, without notes or commentary.

{{text}}"#
                .to_string(),
        }
    }
}

/// Prompts for thumbnail analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionPrompts {
    pub user: String,
}

impl Default for VisionPrompts {
    fn default() -> Self {
        Self {
            user: "Describe this video thumbnail. Mention any visible text, people, emotions and the main visual themes.".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let summary_path = custom_path.join("summary.toml");
            if summary_path.exists() {
                let content = std::fs::read_to_string(&summary_path)?;
                prompts.summary = toml::from_str(&content)?;
            }

            let translate_path = custom_path.join("translate.toml");
            if translate_path.exists() {
                let content = std::fs::read_to_string(&translate_path)?;
                prompts.translate = toml::from_str(&content)?;
            }

            let vision_path = custom_path.join("vision.toml");
            if vision_path.exists() {
                let content = std::fs::read_to_string(&vision_path)?;
                prompts.vision = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.summary.chunk.contains("{{chunk}}"));
        assert!(prompts.summary.consolidate.contains("{{summaries}}"));
        assert!(prompts.translate.user.contains("{{text}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_custom_variables_yield_to_provided() {
        let mut custom = HashMap::new();
        custom.insert("tone".to_string(), "formal".to_string());
        custom.insert("language".to_string(), "de".to_string());
        let prompts = Prompts::load(None, Some(&custom)).unwrap();

        let mut vars = HashMap::new();
        vars.insert("language".to_string(), "fr".to_string());
        let out = prompts.render_with_custom("{{tone}} in {{language}}", &vars);
        assert_eq!(out, "formal in fr");
    }

    #[test]
    fn test_load_custom_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("translate.toml"),
            "user = \"Into {{language}}: {{text}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.translate.user, "Into {{language}}: {{text}}");
        assert!(prompts.summary.chunk.contains("{{index}}"));
    }
}
