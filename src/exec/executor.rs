// src/exec/executor.rs

//! The retry loop.
//!
//! `ReliableExecutor` runs a command through a [`ProcessBackend`], tees every
//! output chunk to the caller's own stdout/stderr and to the bound
//! strategies, and re-runs the command for as long as a strategy vouches
//! that the failure was transient.
//!
//! Each call to [`ReliableExecutor::run`] builds fresh strategy instances, so
//! match budgets never leak from one invocation into the next.

use std::fmt;
use std::io::Write;

use tracing::{debug, info};

use crate::classify::LineBuffer;
use crate::errors::Result;
use crate::registry::{StrategyFactory, StrategyRegistry, StrategySelection};
use crate::strategy::Strategy;
use crate::types::Stream;

use super::backend::{OutputSink, ProcessBackend, TokioBackend};
use super::command::CommandLine;
use super::outcome::{OutputChunk, ProcessOutcome};

/// Passed to the retry observer between a failed attempt and the next one.
#[derive(Debug, Clone, Copy)]
pub struct RetryContext<'a> {
    /// The attempt that failed.
    pub outcome: &'a ProcessOutcome,
    /// Name of the strategy that asked for the retry.
    pub strategy: &'a str,
    /// The strategy's justification.
    pub reason: &'a str,
    /// 1-based number of the failed attempt.
    pub attempt: u32,
}

/// Callback invoked synchronously before every retry.
pub type RetryObserver = Box<dyn FnMut(&RetryContext<'_>) + Send>;

struct BoundStrategy {
    name: String,
    factory: StrategyFactory,
}

/// What the executor does around the process, decided at construction.
enum ExecutionMode {
    /// Run once and hand back whatever happened.
    Passthrough,
    /// Run under these strategies, in bind order.
    Wrapped(Vec<BoundStrategy>),
}

pub struct ReliableExecutor<B: ProcessBackend = TokioBackend> {
    command: CommandLine,
    mode: ExecutionMode,
    backend: B,
    stdout: Box<dyn Write + Send>,
    stderr: Box<dyn Write + Send>,
    observer: Option<RetryObserver>,
}

impl<B: ProcessBackend> fmt::Debug for ReliableExecutor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReliableExecutor")
            .field("command", &self.command)
            .field("strategies", &self.strategy_names())
            .finish_non_exhaustive()
    }
}

impl ReliableExecutor<TokioBackend> {
    /// Bind `command` to the built-in strategies picked by `selection`.
    pub fn new(command: CommandLine, selection: &StrategySelection) -> Result<Self> {
        Self::with_registry(command, selection, StrategyRegistry::builtin()?)
    }

    /// Bind `command` to strategies from `registry`.
    ///
    /// Naming a strategy the registry does not know is an error. Auto mode
    /// that finds nothing for the program, `none`, or an empty list all
    /// produce a plain passthrough executor.
    pub fn with_registry(
        command: CommandLine,
        selection: &StrategySelection,
        registry: &StrategyRegistry,
    ) -> Result<Self> {
        let mode = bind(&command, selection, registry)?;
        Ok(Self {
            command,
            mode,
            backend: TokioBackend::new(),
            stdout: Box::new(std::io::stdout()),
            stderr: Box::new(std::io::stderr()),
            observer: None,
        })
    }
}

impl<B: ProcessBackend> ReliableExecutor<B> {
    /// Swap the process backend.
    pub fn with_backend<B2: ProcessBackend>(self, backend: B2) -> ReliableExecutor<B2> {
        ReliableExecutor {
            command: self.command,
            mode: self.mode,
            backend,
            stdout: self.stdout,
            stderr: self.stderr,
            observer: self.observer,
        }
    }

    /// Where the child's output is forwarded (defaults to our own stdout and
    /// stderr).
    pub fn with_output<O, E>(mut self, stdout: O, stderr: E) -> Self
    where
        O: Write + Send + 'static,
        E: Write + Send + 'static,
    {
        self.stdout = Box::new(stdout);
        self.stderr = Box::new(stderr);
        self
    }

    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&RetryContext<'_>) + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Names of the bound strategies, in bind order. Empty for passthrough.
    pub fn strategy_names(&self) -> Vec<&str> {
        match &self.mode {
            ExecutionMode::Passthrough => Vec::new(),
            ExecutionMode::Wrapped(bound) => bound.iter().map(|b| b.name.as_str()).collect(),
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self.mode, ExecutionMode::Passthrough)
    }

    /// Run the command, retrying transient failures.
    ///
    /// Returns the outcome of the last attempt: the first success, or the
    /// first failure no strategy vouches for.
    pub async fn run(&mut self) -> Result<ProcessOutcome> {
        let strategies = match &self.mode {
            ExecutionMode::Passthrough => None,
            ExecutionMode::Wrapped(bound) => Some(instantiate(bound)?),
        };

        match strategies {
            None => {
                debug!(command = %self.command, "no strategy bound; running once");
                self.run_attempt(&mut []).await
            }
            Some(strategies) => self.run_with_retries(strategies).await,
        }
    }

    async fn run_with_retries(
        &mut self,
        mut strategies: Vec<Box<dyn Strategy>>,
    ) -> Result<ProcessOutcome> {
        let mut attempt: u32 = 1;

        loop {
            for strategy in strategies.iter_mut() {
                strategy.about_to_run();
            }

            debug!(command = %self.command, attempt, "starting attempt");
            let outcome = self.run_attempt(&mut strategies).await?;
            debug!(
                command = %self.command,
                attempt,
                exit_status = %outcome.status(),
                "attempt finished"
            );

            if outcome.success() {
                return Ok(outcome);
            }

            let Some((strategy, reason)) = first_retry_reason(&mut strategies) else {
                info!(
                    command = %self.command,
                    attempt,
                    exit_status = %outcome.status(),
                    "failure not recognised as transient; giving up"
                );
                return Ok(outcome);
            };

            info!(
                command = %self.command,
                attempt,
                strategy = %strategy,
                reason = %reason,
                exit_status = %outcome.status(),
                "transient failure; retrying"
            );

            if let Some(observer) = self.observer.as_mut() {
                observer(&RetryContext {
                    outcome: &outcome,
                    strategy: &strategy,
                    reason: &reason,
                    attempt,
                });
            }

            attempt += 1;
        }
    }

    async fn run_attempt(
        &mut self,
        strategies: &mut [Box<dyn Strategy>],
    ) -> Result<ProcessOutcome> {
        let mut sink = AttemptSink::new(strategies, self.stdout.as_mut(), self.stderr.as_mut());
        let status = self.backend.run(&self.command, &mut sink).await?;
        let chunks = sink.finish();
        Ok(ProcessOutcome::new(status, chunks))
    }
}

fn bind(
    command: &CommandLine,
    selection: &StrategySelection,
    registry: &StrategyRegistry,
) -> Result<ExecutionMode> {
    let names: Vec<String> = match selection {
        StrategySelection::None => Vec::new(),
        StrategySelection::Auto => match registry.resolve_auto(command.basename()) {
            Some(name) => vec![name.to_string()],
            None => {
                debug!(
                    program = %command.basename(),
                    "no strategy registered for program; running without retries"
                );
                Vec::new()
            }
        },
        StrategySelection::Named(names) => names.clone(),
    };

    if names.is_empty() {
        return Ok(ExecutionMode::Passthrough);
    }

    let bound = names
        .into_iter()
        .map(|name| {
            Ok(BoundStrategy {
                factory: registry.factory(&name)?,
                name,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ExecutionMode::Wrapped(bound))
}

fn instantiate(bound: &[BoundStrategy]) -> Result<Vec<Box<dyn Strategy>>> {
    bound.iter().map(|b| (b.factory)()).collect()
}

/// Ask every strategy, in bind order; the first reason wins.
fn first_retry_reason(strategies: &mut [Box<dyn Strategy>]) -> Option<(String, String)> {
    let mut chosen = None;
    for strategy in strategies.iter_mut() {
        if let Some(reason) = strategy.should_retry() {
            if chosen.is_none() {
                chosen = Some((strategy.name().to_string(), reason));
            }
        }
    }
    chosen
}

/// Tees one attempt's output to the caller, the strategies and the record.
struct AttemptSink<'a> {
    strategies: &'a mut [Box<dyn Strategy>],
    stdout: &'a mut (dyn Write + Send),
    stderr: &'a mut (dyn Write + Send),
    stdout_lines: LineBuffer,
    stderr_lines: LineBuffer,
    chunks: Vec<OutputChunk>,
}

impl<'a> AttemptSink<'a> {
    fn new(
        strategies: &'a mut [Box<dyn Strategy>],
        stdout: &'a mut (dyn Write + Send),
        stderr: &'a mut (dyn Write + Send),
    ) -> Self {
        Self {
            strategies,
            stdout,
            stderr,
            stdout_lines: LineBuffer::new(),
            stderr_lines: LineBuffer::new(),
            chunks: Vec::new(),
        }
    }

    fn classify(&mut self, stream: Stream, line: &str) {
        for strategy in self.strategies.iter_mut() {
            strategy.process(stream, line);
        }
    }

    /// Classify any unterminated trailing lines and return the recorded
    /// chunks.
    fn finish(mut self) -> Vec<OutputChunk> {
        if let Some(line) = self.stdout_lines.finish() {
            self.classify(Stream::Stdout, &line);
        }
        if let Some(line) = self.stderr_lines.finish() {
            self.classify(Stream::Stderr, &line);
        }
        self.chunks
    }
}

impl OutputSink for AttemptSink<'_> {
    fn on_chunk(&mut self, stream: Stream, bytes: &[u8]) -> Result<()> {
        let (out, lines) = match stream {
            Stream::Stdout => (&mut *self.stdout, &mut self.stdout_lines),
            Stream::Stderr => (&mut *self.stderr, &mut self.stderr_lines),
        };
        out.write_all(bytes)?;
        out.flush()?;

        let complete = lines.push(bytes);
        self.chunks.push(OutputChunk::new(stream, bytes));
        for line in complete {
            self.classify(stream, &line);
        }
        Ok(())
    }
}
