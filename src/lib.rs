// src/lib.rs

pub mod classify;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod registry;
pub mod strategy;
pub mod types;

use anyhow::Result;
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::exec::{CommandLine, ReliableExecutor, RetryContext};
use crate::registry::StrategyRegistry;

pub use crate::exec::{ExitStatus, ProcessOutcome};
pub use crate::registry::StrategySelection;
pub use crate::strategy::{PatternStrategy, Strategy};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - optional config loading
/// - the strategy registry
/// - the executor, with a retry observer that tells the operator what is
///   being retried and why
///
/// Resolves to the exit code the binary should exit with.
pub async fn run(args: CliArgs) -> Result<i32> {
    let registry = match &args.config {
        Some(path) => StrategyRegistry::from_config(&load_and_validate(path)?)?,
        None => StrategyRegistry::builtin()?.clone(),
    };

    if args.list {
        print_strategies(&registry);
        return Ok(0);
    }

    let selection = args.selection().map_err(anyhow::Error::msg)?;
    let command = CommandLine::new(args.command)?;

    let mut executor = ReliableExecutor::with_registry(command, &selection, &registry)?
        .on_retry(report_retry);
    debug!(
        command = %executor.command(),
        strategies = ?executor.strategy_names(),
        "executor bound"
    );

    let outcome = executor.run().await?;
    Ok(outcome.status().exit_code())
}

fn report_retry(ctx: &RetryContext<'_>) {
    eprintln!(
        "reliable: attempt {} failed ({}); retrying because of {}: {}",
        ctx.attempt,
        ctx.outcome.status(),
        ctx.strategy,
        ctx.reason
    );
}

fn print_strategies(registry: &StrategyRegistry) {
    println!("strategies ({}):", registry.list_available().len());
    for name in registry.names() {
        println!("  - {name}");
    }
}
