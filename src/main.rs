use anyhow::Result;
use clap::Parser;
use profile_scorer::app_log;
use profile_scorer::cli::{handle_command, Cli};
use profile_scorer::config::AppConfig;
use profile_scorer::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    init_logging(&config.paths.log_file)?;

    config.log_summary();

    if let Err(e) = handle_command(cli, config).await {
        app_log!(error, "{:#}", e);
        return Err(e);
    }
    Ok(())
}
