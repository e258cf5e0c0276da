use std::io::Write;

use clap::Parser;
use tracing::debug;

use vtax_cli::app::App;
use vtax_cli::cli::Cli;
use vtax_cli::config::AppConfig;
use vtax_cli::{commands, logging};

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();
    if let Some(level) = &cli.log_level {
        logging::set_log_level(level)?;
    }
    if let Some(path) = &cli.log_file {
        logging::enable_file_logging(path)?;
    }
    if cli.quiet {
        logging::set_console_enabled(false)?;
    }

    let mut config = AppConfig::load(cli.config.as_deref()).await?;
    config.apply_overrides(cli.backend, cli.db);

    debug!("connecting to {} backend", config.database.backend);
    let app = App::open(config).await?;

    let mut stdout = std::io::stdout().lock();
    commands::run(&app, cli.command, &mut stdout).await?;
    stdout.flush()?;

    Ok(())
}
