// CLI module for soundscape-ingest

pub mod commands;
pub mod config;
pub mod output;

pub use config::{Commands, Config};
pub use output::{OutputFormat, OutputFormatter};
