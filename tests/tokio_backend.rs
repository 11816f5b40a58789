// tests/tokio_backend.rs
//
// These spawn real processes through `sh`.
#![cfg(unix)]

use std::error::Error;

use reliable::exec::{CommandLine, ExitStatus, ReliableExecutor};
use reliable::registry::{StrategyRegistry, StrategySelection};
use reliable::types::Stream;
use reliable_test_utils::{init_tracing, with_timeout, SharedBuffer};

type TestResult = Result<(), Box<dyn Error>>;

fn sh(script: &str) -> CommandLine {
    CommandLine::new(["sh", "-c", script]).unwrap()
}

fn passthrough(command: CommandLine) -> (ReliableExecutor, SharedBuffer, SharedBuffer) {
    let out = SharedBuffer::new();
    let err = SharedBuffer::new();
    let exec = ReliableExecutor::new(command, &StrategySelection::None)
        .unwrap()
        .with_output(out.clone(), err.clone());
    (exec, out, err)
}

#[tokio::test]
async fn output_is_forwarded_byte_for_byte() -> TestResult {
    init_tracing();

    let (mut exec, out, err) =
        passthrough(sh("printf 'one\\ntwo'; printf 'warn\\n' >&2; printf '\\r3\\n'"));
    let outcome = with_timeout(exec.run()).await?;

    assert!(outcome.success());
    assert_eq!(out.text(), "one\ntwo\r3\n");
    assert_eq!(err.text(), "warn\n");
    assert_eq!(outcome.stdout(), out.text());
    assert_eq!(outcome.stderr(), err.text());
    assert!(outcome.chunks().iter().any(|c| c.stream == Stream::Stderr));
    Ok(())
}

#[tokio::test]
async fn exit_codes_are_reported() -> TestResult {
    init_tracing();

    let (mut exec, _out, _err) = passthrough(sh("exit 3"));
    let outcome = with_timeout(exec.run()).await?;

    assert_eq!(outcome.status(), &ExitStatus::Exited(3));
    assert_eq!(outcome.status().raw(), 3 << 8);
    Ok(())
}

#[tokio::test]
async fn signals_are_distinguished_from_exit_codes() -> TestResult {
    init_tracing();

    let (mut exec, _out, _err) = passthrough(sh("kill -TERM $$"));
    let outcome = with_timeout(exec.run()).await?;

    assert_eq!(outcome.status().signal(), Some(15));
    assert_eq!(outcome.status().code(), None);
    assert_eq!(outcome.status().exit_code(), 143);
    Ok(())
}

#[tokio::test]
async fn missing_program_is_not_started() -> TestResult {
    init_tracing();

    let (mut exec, out, err) =
        passthrough(CommandLine::new(["/nonexistent/reliable-test-binary"])?);
    let outcome = with_timeout(exec.run()).await?;

    assert!(matches!(outcome.status(), ExitStatus::NotStarted(_)));
    assert!(out.contents().is_empty());
    assert!(err.contents().is_empty());
    Ok(())
}

#[tokio::test]
async fn real_process_is_retried_until_it_succeeds() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("seen");
    let script = format!(
        "if [ -e '{m}' ]; then echo done; else touch '{m}'; \
         echo 'ssh: connect to host example.com port 22: Connection refused' >&2; exit 255; fi",
        m = marker.display()
    );

    let out = SharedBuffer::new();
    let err = SharedBuffer::new();
    let mut exec = ReliableExecutor::with_registry(
        sh(&script),
        &StrategySelection::named("ssh"),
        StrategyRegistry::builtin()?,
    )?
    .with_output(out.clone(), err.clone());

    let outcome = with_timeout(exec.run()).await?;

    assert!(outcome.success());
    assert_eq!(out.text(), "done\n");
    assert!(err.text().contains("Connection refused"));
    Ok(())
}
