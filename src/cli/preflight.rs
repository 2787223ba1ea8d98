//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::error::{Result, TldwError};
use crate::openai::is_api_key_configured;
use std::process::Command;

/// Tools the pipeline shells out to.
pub const REQUIRED_TOOLS: [&str; 3] = ["yt-dlp", "ffmpeg", "ffprobe"];

/// Check everything a pipeline run needs: the API key and the download tools.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check_pipeline() -> Result<()> {
    check_api_key()?;
    for tool in REQUIRED_TOOLS {
        check_tool(tool)?;
    }
    Ok(())
}

fn check_api_key() -> Result<()> {
    if is_api_key_configured() {
        Ok(())
    } else {
        Err(TldwError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        ))
    }
}

/// Flag that makes a tool print its version.
pub(crate) fn version_arg(name: &str) -> &'static str {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg(version_arg(name)).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(TldwError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TldwError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(TldwError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
