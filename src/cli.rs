// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::registry::StrategySelection;

/// Command-line arguments for `reliable`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "reliable",
    version,
    about = "Run a command, retrying failures that look transient.",
    long_about = None
)]
pub struct CliArgs {
    /// Retry strategy: "auto" (pick from the program name), "none", or a
    /// strategy name. Repeat or comma-separate to bind several.
    #[arg(long, short = 's', value_name = "STRATEGY")]
    pub strategy: Vec<String>,

    /// Optional TOML file defining extra strategies and the match budget.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RELIABLE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the available strategies and exit.
    #[arg(long)]
    pub list: bool,

    /// Program to run, followed by its arguments.
    #[arg(
        value_name = "COMMAND",
        required_unless_present = "list",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

impl CliArgs {
    /// Strategy selection from the `--strategy` flags; `auto` if none given.
    pub fn selection(&self) -> Result<StrategySelection, String> {
        if self.strategy.is_empty() {
            return Ok(StrategySelection::Auto);
        }
        self.strategy.join(",").parse()
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
