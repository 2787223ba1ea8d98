//! Summarize command implementation.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::request::{FileType, OutputType, RequestSpec, ResponsePayload};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Run the pipeline for one video and print the result.
pub async fn run_summarize(
    url: &str,
    output_type: OutputType,
    language: &str,
    file_type: FileType,
    json: bool,
    settings: Settings,
) -> Result<()> {
    preflight::check_pipeline()?;

    let orchestrator = Orchestrator::new(&settings)?;
    let spec = RequestSpec::new(url)
        .with_output_type(output_type)
        .with_language(language)
        .with_file_type(file_type);

    let spinner = (!json).then(|| Output::spinner("Processing video..."));
    let result = orchestrator.process(&spec).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let response = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    print_response(&response, orchestrator.exporter().files_dir(), &settings.export.route_prefix);
    Ok(())
}

fn print_response(response: &ResponsePayload, files_dir: &Path, route_prefix: &str) {
    Output::header("Video");
    Output::video_info(&response.metadata);

    if let Some(summary) = &response.summary {
        Output::header("Summary");
        println!("{}", summary);
    }

    if let Some(transcript) = &response.transcript {
        Output::header("Transcript");
        println!("{}", transcript);
    }

    if response.download_links.is_empty() {
        Output::warning("No files were exported.");
    } else {
        Output::header("Files");
        for link in &response.download_links {
            Output::list_item(&local_path(files_dir, route_prefix, link).display().to_string());
        }
    }
    println!();
}

/// Map a download link back to the file it serves.
fn local_path(files_dir: &Path, route_prefix: &str, link: &str) -> PathBuf {
    let prefix = format!("/{}/", route_prefix.trim_matches('/'));
    match link.strip_prefix(&prefix) {
        Some(relative) => files_dir.join(relative),
        None => PathBuf::from(link),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path() {
        let path = local_path(
            Path::new("/data/files"),
            "/files",
            "/files/AAAAAAAAAAA/token/summary.pdf",
        );
        assert_eq!(path, PathBuf::from("/data/files/AAAAAAAAAAA/token/summary.pdf"));
    }

    #[test]
    fn test_local_path_unknown_prefix() {
        let path = local_path(Path::new("/data/files"), "/files", "/other/summary.txt");
        assert_eq!(path, PathBuf::from("/other/summary.txt"));
    }
}
