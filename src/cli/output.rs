//! CLI output formatting utilities.

use crate::media::VideoMetadata;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print the descriptive fields of a video.
    pub fn video_info(metadata: &VideoMetadata) {
        println!("  {}", style(&metadata.title).bold());
        if let Some(uploader) = &metadata.uploader {
            Self::kv("Uploader", uploader);
        }
        if let Some(date) = &metadata.upload_date {
            Self::kv("Uploaded", &format_upload_date(date));
        }
        Self::kv("Duration", &format_duration(metadata.duration));
        if let Some(views) = metadata.view_count {
            Self::kv("Views", &views.to_string());
        }
        Self::kv("URL", &metadata.video_url);
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format duration in seconds to a human-readable string.
fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// YYYYMMDD to YYYY-MM-DD; anything else is shown as-is.
fn format_upload_date(date: &str) -> String {
    match chrono::NaiveDate::parse_from_str(date, "%Y%m%d") {
        Ok(parsed) => parsed.format("%Y-%m-%d").to_string(),
        Err(_) => date.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(212), "3m 32s");
        assert_eq!(format_duration(3723), "1h 2m 3s");
    }

    #[test]
    fn test_format_upload_date() {
        assert_eq!(format_upload_date("20091025"), "2009-10-25");
        assert_eq!(format_upload_date("unknown"), "unknown");
    }
}
