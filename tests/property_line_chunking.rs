// tests/property_line_chunking.rs

mod common;
use crate::common::{collect_events, start_relay};

use proptest::prelude::*;

use payload_launcher::relay::{RelayEvent, RelayOptions};
use payload_launcher_test_utils::fake_process::FakeProcess;

/// Lines the way a reader sees them: split on '\n', a trailing terminator
/// does not start another line.
fn expected_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    if text.ends_with('\n') {
        lines.pop();
    }
    lines
}

fn split_at_cuts(text: &str, cuts: &[usize]) -> Vec<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut points: Vec<usize> = cuts.iter().map(|c| c % (bytes.len() + 1)).collect();
    points.push(0);
    points.push(bytes.len());
    points.sort_unstable();
    points.dedup();
    points
        .windows(2)
        .map(|w| bytes[w[0]..w[1]].to_vec())
        .collect()
}

fn relay_lines(chunks: Vec<Vec<u8>>) -> Vec<RelayEvent> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async move {
        let process = FakeProcess::new().with_output_chunks(chunks);
        let (_handle, mut rx) = start_relay(process.boxed(), RelayOptions::default());
        collect_events(&mut rx).await
    })
}

proptest! {
    #[test]
    fn chunk_boundaries_never_change_emitted_lines(
        lines in proptest::collection::vec("[a-z0-9 ]{0,12}", 0..30),
        cuts in proptest::collection::vec(any::<usize>(), 0..20),
        trailing_newline in any::<bool>(),
    ) {
        let mut text = lines.join("\n");
        if trailing_newline {
            text.push('\n');
        }
        let expected = expected_lines(&text);

        let events = relay_lines(split_at_cuts(&text, &cuts));

        let got: Vec<String> = events
            .iter()
            .filter_map(|e| match e {
                RelayEvent::Line(l) => Some(l.clone()),
                _ => None,
            })
            .collect();
        prop_assert_eq!(&got, &expected);
        prop_assert_eq!(events.len(), expected.len() + 2);
        prop_assert_eq!(&events[expected.len()], &RelayEvent::StreamClosed);
        prop_assert_eq!(
            &events[expected.len() + 1],
            &RelayEvent::ProcessExited { code: Some(0) }
        );
    }
}
