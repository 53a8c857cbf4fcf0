// tests/relay_output.rs

mod common;
use crate::common::{collect_events, init_tracing, line, start_relay, with_timeout};

use std::error::Error;

use payload_launcher::relay::{RelayEvent, RelayOptions, RelayState};
use payload_launcher::types::StderrMode;
use payload_launcher_test_utils::fake_process::FakeProcess;
use payload_launcher_test_utils::streams::{bytes_stream, chunked_stream};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn lines_then_stream_closed_then_exit() -> TestResult {
    init_tracing();
    let (process, exit_tx) = FakeProcess::new()
        .with_output_chunks(["a\n", "b\n"])
        .exit_on_signal();
    let (mut handle, mut rx) = start_relay(process.boxed(), RelayOptions::default());

    assert_eq!(with_timeout(rx.recv()).await, Some(line("a")));
    assert_eq!(with_timeout(rx.recv()).await, Some(line("b")));
    assert_eq!(with_timeout(rx.recv()).await, Some(RelayEvent::StreamClosed));

    // Nothing more until the process actually exits.
    assert_eq!(with_timeout(handle.wait_for_state(RelayState::Waiting)).await, RelayState::Waiting);
    assert!(rx.try_recv().is_err());

    exit_tx.send(Some(0)).map_err(|_| "relay dropped exit signal")?;
    assert_eq!(
        with_timeout(rx.recv()).await,
        Some(RelayEvent::ProcessExited { code: Some(0) })
    );
    assert_eq!(with_timeout(rx.recv()).await, None);

    with_timeout(handle.join()).await?;
    Ok(())
}

#[tokio::test]
async fn partial_final_line_is_emitted() -> TestResult {
    init_tracing();
    let process = FakeProcess::new().with_output_bytes("x").exit_code(Some(7));
    let (handle, mut rx) = start_relay(process.boxed(), RelayOptions::default());

    let events = with_timeout(collect_events(&mut rx)).await;
    assert_eq!(
        events,
        vec![
            line("x"),
            RelayEvent::StreamClosed,
            RelayEvent::ProcessExited { code: Some(7) },
        ]
    );
    assert_eq!(handle.state(), RelayState::Exited);
    Ok(())
}

#[tokio::test]
async fn thousand_lines_arrive_in_order_exactly_once() -> TestResult {
    init_tracing();
    let chunks: Vec<String> = (0..1000).map(|i| format!("line {i}\n")).collect();
    let process = FakeProcess::new().with_output_chunks(chunks);
    let (_handle, mut rx) = start_relay(process.boxed(), RelayOptions::default());

    let events = with_timeout(collect_events(&mut rx)).await;

    let lines: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            RelayEvent::Line(l) => Some(l.clone()),
            _ => None,
        })
        .collect();
    let expected: Vec<String> = (0..1000).map(|i| format!("line {i}")).collect();
    assert_eq!(lines, expected);
    assert_eq!(events.len(), 1002);
    assert_eq!(events[1000], RelayEvent::StreamClosed);
    Ok(())
}

#[tokio::test]
async fn lines_split_across_chunks_are_reassembled() -> TestResult {
    let process = FakeProcess::new().with_output_chunks(["he", "llo\nwor", "ld\r\n", "\n", "tail"]);
    let (_handle, mut rx) = start_relay(process.boxed(), RelayOptions::default());

    let events = with_timeout(collect_events(&mut rx)).await;
    assert_eq!(
        &events[..4],
        &[line("hello"), line("world"), line(""), line("tail")]
    );
    Ok(())
}

#[tokio::test]
async fn invalid_utf8_is_decoded_lossily() -> TestResult {
    let process = FakeProcess::new().with_output_bytes(b"ok\n\xff\xfe bytes\n".to_vec());
    let (_handle, mut rx) = start_relay(process.boxed(), RelayOptions::default());

    let events = with_timeout(collect_events(&mut rx)).await;
    assert_eq!(events[0], line("ok"));
    assert_eq!(events[1], line("\u{fffd}\u{fffd} bytes"));
    Ok(())
}

#[tokio::test]
async fn empty_output_still_reports_lifecycle() -> TestResult {
    let process = FakeProcess::new().with_output_bytes(Vec::new()).exit_code(None);
    let (_handle, mut rx) = start_relay(process.boxed(), RelayOptions::default());

    let events = with_timeout(collect_events(&mut rx)).await;
    assert_eq!(
        events,
        vec![RelayEvent::StreamClosed, RelayEvent::ProcessExited { code: None }]
    );
    Ok(())
}

#[tokio::test]
async fn separate_stderr_lines_are_tagged() -> TestResult {
    init_tracing();
    let process = FakeProcess::new()
        .with_output(chunked_stream(["out 1\n", "out 2\n"]))
        .with_error_output(bytes_stream("err 1\nerr 2\n"));
    let options = RelayOptions {
        stderr_mode: StderrMode::Separate,
        ..RelayOptions::default()
    };
    let (_handle, mut rx) = start_relay(process.boxed(), options);

    let events = with_timeout(collect_events(&mut rx)).await;

    let stdout: Vec<&RelayEvent> = events.iter().filter(|e| matches!(e, RelayEvent::Line(_))).collect();
    let stderr: Vec<&RelayEvent> = events
        .iter()
        .filter(|e| matches!(e, RelayEvent::ErrorLine(_)))
        .collect();
    assert_eq!(stdout, vec![&line("out 1"), &line("out 2")]);
    assert_eq!(
        stderr,
        vec![
            &RelayEvent::ErrorLine("err 1".to_string()),
            &RelayEvent::ErrorLine("err 2".to_string())
        ]
    );
    // Stream end is only reported once both pipes are closed.
    assert_eq!(events[4], RelayEvent::StreamClosed);
    assert_eq!(events[5], RelayEvent::ProcessExited { code: Some(0) });
    Ok(())
}

#[tokio::test]
async fn combined_mode_reports_stray_stderr_as_output() -> TestResult {
    let process = FakeProcess::new()
        .with_output_bytes(Vec::new())
        .with_error_output(bytes_stream("warning\n"));
    let (_handle, mut rx) = start_relay(process.boxed(), RelayOptions::default());

    let events = with_timeout(collect_events(&mut rx)).await;
    assert_eq!(events[0], line("warning"));
    Ok(())
}
