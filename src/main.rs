use anyhow::{Context, Result};
use clap::Parser;
use tabstree::cli::{self, Cli};
use tabstree_config::Config;
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // CLI --log-level takes highest precedence, then RUST_LOG, then config
    tabstree::debug::init_log_bridge(cli.log_level.map(|l| l.to_level_filter()));

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };
    tabstree::debug::set_log_level(config.log_level.to_level_filter());

    log::info!("Starting tabstree {}", tabstree::VERSION);

    let runtime = Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(cli::commands::execute(cli.command, &config));

    if let Err(ref e) = result {
        log::error!("tabstree: {e:#}");
    }
    result
}
