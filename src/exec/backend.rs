// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The executor talks to a `ProcessBackend` instead of spawning processes
//! itself. This makes it easy to swap in a scripted backend in tests while
//! keeping the production implementation here.
//!
//! - `TokioBackend` is the default implementation. It spawns the program
//!   with `tokio::process::Command` and streams both pipes as they fill.
//! - Tests can provide their own `ProcessBackend` that replays canned
//!   output and exit statuses.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::errors::{ReliableError, Result};
use crate::types::Stream;

use super::command::CommandLine;
use super::outcome::ExitStatus;

/// Hard ceiling on the wall-clock time of a single attempt.
///
/// Deliberately generous: it only exists so a wedged process cannot hang the
/// caller forever. A process that hits it is killed and its status is
/// classified like any other failure.
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Receives output from a running attempt, chunk by chunk, as it arrives.
pub trait OutputSink: Send {
    fn on_chunk(&mut self, stream: Stream, bytes: &[u8]) -> Result<()>;
}

/// Trait abstracting how a single attempt of a command is executed.
///
/// Production code uses [`TokioBackend`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ProcessBackend: Send {
    /// Run `command` once, passing every output chunk to `sink` in arrival
    /// order, and resolve to its exit status.
    ///
    /// A program that cannot be started resolves to
    /// [`ExitStatus::NotStarted`]; errors are reserved for IO failures after
    /// the process is running and for errors returned by `sink`.
    fn run<'a>(
        &'a mut self,
        command: &'a CommandLine,
        sink: &'a mut dyn OutputSink,
    ) -> Pin<Box<dyn Future<Output = Result<ExitStatus>> + Send + 'a>>;
}

/// Real backend used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioBackend;

impl TokioBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessBackend for TokioBackend {
    fn run<'a>(
        &'a mut self,
        command: &'a CommandLine,
        sink: &'a mut dyn OutputSink,
    ) -> Pin<Box<dyn Future<Output = Result<ExitStatus>> + Send + 'a>> {
        Box::pin(async move {
            let mut cmd = Command::new(command.program());
            cmd.args(command.args())
                .stdin(Stdio::inherit())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(err) => {
                    warn!(
                        command = %command,
                        error = %err,
                        "failed to start process"
                    );
                    return Ok(ExitStatus::NotStarted(err.to_string()));
                }
            };

            let stdout = child.stdout.take();
            let stderr = child.stderr.take();

            let finished = timeout(ATTEMPT_TIMEOUT, async {
                pump(stdout, stderr, sink).await?;
                Ok::<_, ReliableError>(child.wait().await?)
            })
            .await;

            match finished {
                Ok(status) => Ok(ExitStatus::from(status?)),
                Err(_) => {
                    warn!(
                        command = %command,
                        timeout_secs = ATTEMPT_TIMEOUT.as_secs(),
                        "attempt exceeded time limit; killing process"
                    );
                    child.kill().await?;
                    Ok(ExitStatus::from(child.wait().await?))
                }
            }
        })
    }
}

/// Forward both pipes to `sink` until each reaches end of file.
async fn pump<O, E>(stdout: Option<O>, stderr: Option<E>, sink: &mut dyn OutputSink) -> Result<()>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut stdout = stdout;
    let mut stderr = stderr;
    let mut out_buf = [0u8; READ_BUFFER_SIZE];
    let mut err_buf = [0u8; READ_BUFFER_SIZE];

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            read = read_some(&mut stdout, &mut out_buf), if stdout.is_some() => {
                match read? {
                    0 => {
                        debug!("stdout closed");
                        stdout = None;
                    }
                    n => sink.on_chunk(Stream::Stdout, &out_buf[..n])?,
                }
            }
            read = read_some(&mut stderr, &mut err_buf), if stderr.is_some() => {
                match read? {
                    0 => {
                        debug!("stderr closed");
                        stderr = None;
                    }
                    n => sink.on_chunk(Stream::Stderr, &err_buf[..n])?,
                }
            }
        }
    }

    Ok(())
}

async fn read_some<R>(reader: &mut Option<R>, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match reader {
        Some(r) => r.read(buf).await,
        None => std::future::pending().await,
    }
}
