// CLI configuration
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use soundscape_ingest::upload::License;
use soundscape_ingest::IngestConfig;

use crate::cli::output::OutputFormat;

/// Soundscape ingest - read audio tags and upload content
#[derive(Parser, Debug)]
#[command(name = "soundscape-ingest")]
#[command(about = "Read audio tags and upload content to a soundscape server", long_about = None)]
#[command(version)]
pub struct Config {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub format: OutputFormat,

    /// Quiet mode (suppress progress messages)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON settings file
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read title, artist and genre from audio file(s)
    Read {
        /// Audio file paths or glob patterns
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,

        /// Output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the tag formats present in audio file(s)
    Detect {
        /// Audio file paths or glob patterns
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,
    },

    /// Upload an audio file in parts and register its details
    Upload(UploadArgs),
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Audio file to upload
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Specify for an actual run; without it only the details are shown
    #[arg(short = 'n', long)]
    pub no_dry_run: bool,

    /// Base URL of the upload endpoints (overrides the settings file)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Part size in bytes (overrides the settings file)
    #[arg(long)]
    pub part_size: Option<u64>,

    /// Request timeout in seconds (overrides the settings file)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// MIME type; guessed from the file extension if omitted
    #[arg(long)]
    pub content_type: Option<String>,

    /// Read the complete details from a JSON file instead of the flags below
    #[arg(long, value_name = "PATH")]
    pub details: Option<PathBuf>,

    /// Title; read from the file's tags if omitted
    #[arg(short, long)]
    pub title: Option<String>,

    /// Artist; read from the file's tags if omitted
    #[arg(short, long)]
    pub artist: Option<String>,

    /// Genre; read from the file's tags if omitted
    #[arg(short, long)]
    pub genre: Option<String>,

    /// Release date as YYYY-MM-DD; the file's modification date if omitted
    #[arg(long)]
    pub date: Option<NaiveDate>,

    #[arg(long, default_value_t = 0)]
    pub min_bpm: u32,

    #[arg(long, default_value_t = 0)]
    pub max_bpm: u32,

    #[arg(long, default_value = "")]
    pub comment: String,

    /// cc0, cc-by, cc-by-sa, cc-by-nc, cc-by-nd, cc-by-nc-sa, cc-by-nc-nd;
    /// any other text is a custom license
    #[arg(short, long, default_value = "cc0")]
    pub license: License,
}

impl Config {
    /// Settings from `--config`, or the defaults
    pub fn load_settings(&self) -> Result<IngestConfig> {
        match &self.config {
            Some(path) => IngestConfig::from_file(path)
                .with_context(|| format!("loading settings from {}", path.display())),
            None => Ok(IngestConfig::default()),
        }
    }
}

impl UploadArgs {
    /// Apply command-line overrides to the loaded settings
    pub fn apply_overrides(&self, mut settings: IngestConfig) -> Result<IngestConfig> {
        if let Some(endpoint) = &self.endpoint {
            settings.endpoint = Some(endpoint.clone());
        }
        if let Some(part_size) = self.part_size {
            settings.part_size = part_size;
        }
        if let Some(timeout) = self.timeout {
            settings.request_timeout_secs = timeout;
        }
        settings.validate()?;
        Ok(settings)
    }
}
