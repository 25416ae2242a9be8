//! Command-line interface for tabstree.
//!
//! Argument parsing lives here; the subcommand bodies are in [`commands`].

pub mod commands;

use crate::forest::WindowId;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tabstree - per-window tab hierarchy store
#[derive(Parser)]
#[command(name = "tabstree")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of ~/.config/tabstree/config.yaml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set debug log level (overrides config and RUST_LOG)
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevelArg>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the persisted tab hierarchy
    Show {
        /// Only this window
        #[arg(long, value_name = "ID")]
        window: Option<WindowId>,

        /// Print the stored JSON instead of a tree
        #[arg(long)]
        json: bool,
    },

    /// Replay lifecycle events (JSON lines) against a simulated browser
    Replay {
        /// File with one event or request per line
        events: PathBuf,

        /// Write the result to the configured storage instead of memory
        #[arg(long)]
        persist: bool,
    },

    /// Delete the persisted tab hierarchy
    Reset {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tabstree",
            "show",
            "--window",
            "3",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Show {
                window: Some(3),
                json: false
            }
        ));
        assert_eq!(
            cli.log_level.map(LogLevelArg::to_level_filter),
            Some(log::LevelFilter::Debug)
        );
    }
}
