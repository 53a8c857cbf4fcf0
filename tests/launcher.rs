// tests/launcher.rs

mod common;
use crate::common::{collect_events, init_tracing, with_timeout};

use std::collections::BTreeMap;
use std::error::Error;
use std::io;
use std::path::Path;

use tokio::sync::mpsc;

use payload_launcher::launch::{
    build_env, launch, search_path_separator, LaunchError, StderrMode, TargetAddress,
    SEARCH_PATH_VAR,
};
use payload_launcher::relay::RelayEvent;
use payload_launcher_test_utils::fake_process::FakeProcess;
use payload_launcher_test_utils::fake_spawner::RecordingSpawner;

type TestResult = Result<(), Box<dyn Error>>;

fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn build_env_appends_to_existing_search_path() {
    let sep = search_path_separator();
    let base = env(&[(SEARCH_PATH_VAR, "/system/bin"), ("HOME", "/data")]);

    let built = build_env(base, &["/data/files".to_string(), "/opt/tools".to_string()]);

    assert_eq!(
        built.get(SEARCH_PATH_VAR).map(String::as_str),
        Some(format!("/system/bin{sep}/data/files{sep}/opt/tools").as_str())
    );
    assert_eq!(built.get("HOME").map(String::as_str), Some("/data"));
}

#[test]
fn build_env_creates_missing_search_path() {
    let sep = search_path_separator();
    let built = build_env(env(&[("HOME", "/data")]), &["/a".to_string(), "/b".to_string()]);

    assert_eq!(
        built.get(SEARCH_PATH_VAR).map(String::as_str),
        Some(format!("/a{sep}/b").as_str())
    );
}

#[test]
fn build_env_without_extra_entries_is_passthrough() {
    let base = env(&[("HOME", "/data")]);
    let built = build_env(base.clone(), &[]);
    let expected: BTreeMap<String, String> = base.into_iter().collect();
    assert_eq!(built, expected);
}

#[test]
fn launch_hands_spawner_the_extended_environment() -> TestResult {
    init_tracing();
    let sep = search_path_separator();
    let spawner = RecordingSpawner::new();
    let args = vec!["192.168.10.133".to_string(), "1337".to_string()];

    // Variable present.
    launch(
        &spawner,
        Path::new("/data/files/diffuzz-client"),
        &args,
        env(&[(SEARCH_PATH_VAR, "/system/bin")]),
        &["/data/files".to_string()],
        StderrMode::Combined,
    )?;
    // Variable absent.
    launch(
        &spawner,
        Path::new("/data/files/diffuzz-client"),
        &args,
        env(&[]),
        &["/data/files".to_string()],
        StderrMode::Separate,
    )?;

    let specs = spawner.recorded();
    assert_eq!(specs.len(), 2);

    assert_eq!(specs[0].program, Path::new("/data/files/diffuzz-client"));
    assert_eq!(specs[0].args, args);
    assert_eq!(specs[0].stderr, StderrMode::Combined);
    assert_eq!(
        specs[0].env.get(SEARCH_PATH_VAR).map(String::as_str),
        Some(format!("/system/bin{sep}/data/files").as_str())
    );

    assert_eq!(specs[1].stderr, StderrMode::Separate);
    assert_eq!(
        specs[1].env.get(SEARCH_PATH_VAR).map(String::as_str),
        Some("/data/files")
    );
    Ok(())
}

#[tokio::test]
async fn spawn_failure_is_reported_and_starts_no_relay() -> TestResult {
    init_tracing();
    let spawner = RecordingSpawner::failing(io::ErrorKind::NotFound);
    let (_tx, mut rx) = mpsc::channel::<RelayEvent>(4);

    let result = launch(
        &spawner,
        Path::new("/does/not/exist"),
        &[],
        env(&[]),
        &[],
        StderrMode::Combined,
    );

    match result {
        Err(LaunchError::Spawn { path, cause }) => {
            assert_eq!(path, Path::new("/does/not/exist"));
            assert_eq!(cause.kind(), io::ErrorKind::NotFound);
        }
        Err(e) => panic!("expected Spawn error, got {e:?}"),
        Ok(_) => panic!("expected spawn failure"),
    }

    drop(_tx);
    let events = with_timeout(collect_events(&mut rx)).await;
    assert!(events.is_empty());
    Ok(())
}

#[tokio::test]
async fn real_spawner_reports_missing_executable() {
    init_tracing();
    let result = launch(
        &payload_launcher::launch::TokioSpawner,
        Path::new("/definitely/not/a/payload"),
        &[],
        payload_launcher::launch::current_env(),
        &[],
        StderrMode::Combined,
    );
    assert!(matches!(result, Err(LaunchError::Spawn { .. })));
}

#[test]
fn target_address_is_validated() {
    assert!(TargetAddress::new("192.168.10.133", 1337).is_ok());
    assert!(matches!(TargetAddress::new("", 1337), Err(LaunchError::InvalidTarget(_))));
    assert!(matches!(TargetAddress::new("bad host", 1337), Err(LaunchError::InvalidTarget(_))));
    assert!(matches!(TargetAddress::new("host", 0), Err(LaunchError::InvalidTarget(_))));

    let target = TargetAddress::new("10.0.0.1", 9000).unwrap();
    assert_eq!(target.to_args(), vec!["10.0.0.1".to_string(), "9000".to_string()]);
}

#[test]
fn recording_spawner_hands_out_queued_processes() -> TestResult {
    let spawner = RecordingSpawner::new().with_process(FakeProcess::new().exit_code(Some(3)));
    let process = launch(&spawner, Path::new("p"), &[], env(&[]), &[], StderrMode::Combined)?;
    assert_eq!(process.id(), Some(4242));
    Ok(())
}
