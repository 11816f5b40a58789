// tests/config_strategies.rs

use std::error::Error;
use std::fs;

use reliable::config::{load_and_validate, load_from_str};
use reliable::exec::{CommandLine, ReliableExecutor};
use reliable::registry::{StrategyRegistry, StrategySelection};
use reliable::strategy::Strategy;
use reliable_test_utils::{init_tracing, with_timeout, AttemptBuilder, ScriptedBackend, SharedBuffer};

type TestResult = Result<(), Box<dyn Error>>;

const RSYNC_CONFIG: &str = r#"
[config]
max_matches = 4

[strategy.rsync]
stderr = ['^rsync: connection unexpectedly closed']
either = ['^rsync error: timeout']
auto = ["rsync", "rsync-wrapper"]
max_matches = 2
"#;

fn rsync_closed() -> reliable_test_utils::ScriptedAttempt {
    AttemptBuilder::new()
        .stderr("rsync: connection unexpectedly closed (0 bytes received so far) [Receiver]\n")
        .exit(12)
        .build()
}

#[tokio::test]
async fn config_file_strategy_is_auto_selected_and_retried() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("reliable.toml");
    fs::write(&path, RSYNC_CONFIG)?;

    let cfg = load_and_validate(&path)?;
    let registry = StrategyRegistry::from_config(&cfg)?;
    assert_eq!(registry.resolve_auto("rsync-wrapper"), Some("rsync"));

    let command = CommandLine::new(["/usr/local/bin/rsync-wrapper", "-a", "src/", "host:dst/"])?;
    let mut exec = ReliableExecutor::with_registry(command, &StrategySelection::Auto, &registry)?
        .with_backend(ScriptedBackend::repeating(rsync_closed()))
        .with_output(SharedBuffer::new(), SharedBuffer::new());
    assert_eq!(exec.strategy_names(), vec!["rsync"]);

    let outcome = with_timeout(exec.run()).await?;

    // Per-strategy budget of 2 overrides the global 4.
    assert_eq!(outcome.status().code(), Some(12));
    assert_eq!(exec.backend().attempts(), 3);
    Ok(())
}

#[tokio::test]
async fn global_budget_applies_to_builtins_from_config() -> TestResult {
    init_tracing();

    let registry = StrategyRegistry::from_config(&load_from_str(RSYNC_CONFIG)?)?;
    let mut exec = ReliableExecutor::with_registry(
        CommandLine::new(["ssh", "host"])?,
        &StrategySelection::Auto,
        &registry,
    )?
    .with_backend(ScriptedBackend::repeating(
        reliable_test_utils::builders::ssh_unreachable(),
    ))
    .with_output(SharedBuffer::new(), SharedBuffer::new());

    with_timeout(exec.run()).await?;

    assert_eq!(exec.backend().attempts(), 5);
    Ok(())
}

#[test]
fn either_patterns_match_stdout_too() -> TestResult {
    let cfg = load_from_str(RSYNC_CONFIG)?;
    let mut strategy = StrategyRegistry::from_config(&cfg)?.create("rsync")?;

    strategy.about_to_run();
    strategy.process_stdout("rsync error: timeout in data send/receive (code 30)\n");
    assert!(strategy.should_retry().is_some());
    Ok(())
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_and_validate(dir.path().join("absent.toml")).is_err());
}
