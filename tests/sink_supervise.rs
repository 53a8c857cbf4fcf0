// tests/sink_supervise.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::io;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use payload_launcher::cli::CliArgs;
use payload_launcher::config::{parse_and_validate, ConfigFile};
use payload_launcher::errors::LauncherError;
use payload_launcher::launch::{LaunchError, SEARCH_PATH_VAR};
use payload_launcher::relay::{RelayEvent, RelayFailure};
use payload_launcher::run_with_sink;
use payload_launcher::sink::{drain_events, render_event, MemorySink};
use payload_launcher_test_utils::fake_process::FakeProcess;
use payload_launcher_test_utils::fake_spawner::RecordingSpawner;
use payload_launcher_test_utils::streams::open_stream;

type TestResult = Result<(), Box<dyn Error>>;

fn config() -> ConfigFile {
    parse_and_validate(
        r#"
[install]
dest_dir = "/data/files"
payloads = ["diffuzz-client"]

[launch]
target = "diffuzz-client"
target_host = "192.168.10.133"
target_port = 1337
"#,
    )
    .unwrap()
}

#[test]
fn events_render_as_display_text() {
    assert_eq!(render_event(&RelayEvent::Line("hello".into())), "hello\n");
    assert_eq!(render_event(&RelayEvent::ErrorLine("oops".into())), "[stderr] oops\n");
    assert_eq!(
        render_event(&RelayEvent::StreamClosed),
        "[output stream closed]\n[waiting for process]\n"
    );
    assert_eq!(
        render_event(&RelayEvent::ProcessExited { code: Some(2) }),
        "[process exited with code 2]\n"
    );
    assert_eq!(
        render_event(&RelayEvent::ProcessExited { code: None }),
        "[process terminated by signal]\n"
    );
    assert_eq!(render_event(&RelayEvent::Cancelled), "[relay cancelled]\n");
    assert_eq!(
        render_event(&RelayEvent::RelayError(RelayFailure::StreamRead("boom".into()))),
        "[relay error: reading process output: boom]\n"
    );
}

#[tokio::test]
async fn drain_applies_events_in_order_and_summarises() {
    let (tx, mut rx) = mpsc::channel(8);
    tokio::spawn(async move {
        for ev in [
            RelayEvent::Line("a".into()),
            RelayEvent::Line("b".into()),
            RelayEvent::StreamClosed,
            RelayEvent::ProcessExited { code: Some(0) },
        ] {
            tx.send(ev).await.unwrap();
        }
    });

    let mut sink = MemorySink::new();
    let summary = with_timeout(drain_events(&mut rx, &mut sink)).await;

    assert_eq!(
        sink.lines(),
        vec!["a", "b", "[output stream closed]", "[waiting for process]", "[process exited with code 0]"]
    );
    assert_eq!(sink.appends, 4);
    assert_eq!(summary.lines, 2);
    assert!(summary.stream_closed);
    assert!(summary.exited);
    assert_eq!(summary.exit_code, Some(0));
    assert!(!summary.cancelled);
    assert_eq!(summary.failure, None);
}

#[tokio::test]
async fn supervise_relays_output_into_the_sink() -> TestResult {
    init_tracing();
    let cfg = config();
    let spawner = RecordingSpawner::new()
        .with_process(FakeProcess::new().with_output_chunks(["connected\n", "fuzzing\n"]).exit_code(Some(0)));
    let mut sink = MemorySink::new();

    let summary = with_timeout(payload_launcher::supervise(
        &cfg,
        &spawner,
        vec![(SEARCH_PATH_VAR.to_string(), "/system/bin".to_string())],
        &mut sink,
        std::future::pending::<()>(),
    ))
    .await?;

    assert_eq!(summary.exit_code, Some(0));
    assert_eq!(
        sink.lines(),
        vec![
            "connected",
            "fuzzing",
            "[output stream closed]",
            "[waiting for process]",
            "[process exited with code 0]"
        ]
    );

    let specs = spawner.recorded();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].program, std::path::Path::new("/data/files/diffuzz-client"));
    assert_eq!(specs[0].args, vec!["192.168.10.133", "1337"]);
    let path = specs[0].env.get(SEARCH_PATH_VAR).cloned().unwrap_or_default();
    assert!(path.starts_with("/system/bin"));
    assert!(path.ends_with("/data/files"));
    Ok(())
}

#[tokio::test]
async fn supervise_reports_launch_failure_to_the_sink() {
    init_tracing();
    let cfg = config();
    let spawner = RecordingSpawner::failing(io::ErrorKind::PermissionDenied);
    let mut sink = MemorySink::new();

    let result = with_timeout(payload_launcher::supervise(
        &cfg,
        &spawner,
        Vec::new(),
        &mut sink,
        std::future::pending::<()>(),
    ))
    .await;

    assert!(matches!(
        result,
        Err(LauncherError::Launch(LaunchError::Spawn { .. }))
    ));
    assert_eq!(sink.appends, 1);
    assert!(sink.text.starts_with("[launch failed: spawning '/data/files/diffuzz-client'"));
}

#[tokio::test]
async fn shutdown_cancels_the_relay() -> TestResult {
    init_tracing();
    let cfg = config();
    let (stream, _writer) = open_stream();
    let process = FakeProcess::new().with_output(stream).never_exits();
    let probe = process.probe();
    let spawner = RecordingSpawner::new().with_process(process);
    let mut sink = MemorySink::new();

    let summary = with_timeout(payload_launcher::supervise(
        &cfg,
        &spawner,
        Vec::new(),
        &mut sink,
        tokio::time::sleep(Duration::from_millis(20)),
    ))
    .await?;

    assert!(summary.cancelled);
    assert!(summary.exited);
    assert_eq!(summary.exit_code, None);
    assert!(probe.was_killed());
    assert_eq!(sink.lines(), vec!["[relay cancelled]", "[process terminated by signal]"]);
    Ok(())
}

fn cli_args(config: &Path) -> CliArgs {
    CliArgs {
        config: config.to_path_buf(),
        log_level: None,
        dry_run: false,
        install_only: false,
        separate_stderr: false,
    }
}

#[tokio::test]
async fn missing_config_is_reported_to_the_sink() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let mut sink = MemorySink::new();

    let result = with_timeout(run_with_sink(
        cli_args(&dir.path().join("Launcher.toml")),
        &mut sink,
    ))
    .await;

    assert!(matches!(result, Err(LauncherError::IoError(_))));
    assert_eq!(sink.appends, 1);
    assert!(sink.text.starts_with("[launch failed: "));
}

#[tokio::test]
async fn invalid_config_is_reported_to_the_sink() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Launcher.toml");
    std::fs::write(
        &path,
        r#"
[install]
payloads = ["client"]

[launch]
target = "client"
target_host = "localhost"
target_port = 0
"#,
    )
    .unwrap();
    let mut sink = MemorySink::new();

    let result = with_timeout(run_with_sink(cli_args(&path), &mut sink)).await;

    assert!(matches!(result, Err(LauncherError::ConfigError(_))));
    assert_eq!(sink.appends, 1);
    assert!(sink.text.starts_with("[launch failed: "));
    assert!(sink.text.contains("target_port"));
    assert!(!dir.path().join("payloads").exists());
}
