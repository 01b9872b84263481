// CLI binary entry point for soundscape-ingest

mod cli;

use anyhow::Result;
use clap::Parser;

use cli::commands::{command_detect, command_read, command_upload};
use cli::{Commands, Config, OutputFormatter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(config.verbose);

    let formatter = OutputFormatter::new(config.format, config.quiet);

    let settings = config.load_settings()?;

    match config.command {
        Commands::Read { files, output } => command_read(&files, output.as_deref(), &formatter),
        Commands::Detect { files } => command_detect(&files, &formatter),
        Commands::Upload(args) => command_upload(args, settings, &formatter).await,
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
}
