//! CLI module for tldw.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::request::{FileType, OutputType};
use clap::{Parser, Subcommand};

/// tldw - too long; didn't watch
///
/// Turns a video URL into a transcript and summary, caching every
/// expensive step so repeated requests are served from disk.
#[derive(Parser, Debug)]
#[command(name = "tldw")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Transcribe and summarize a video from the command line
    Summarize {
        /// YouTube URL or video ID
        url: String,

        /// Which texts to produce
        #[arg(short, long, value_enum, default_value_t = OutputType::Both)]
        output_type: OutputType,

        /// Target language code (e.g. en, fr, pt-BR)
        #[arg(short, long, default_value = "en")]
        language: String,

        /// Export file formats
        #[arg(short, long, value_enum, default_value_t = FileType::Both)]
        file_type: FileType,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
