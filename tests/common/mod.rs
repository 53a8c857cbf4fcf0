#![allow(dead_code, unused_imports)]

use tokio::sync::mpsc;

use payload_launcher::process::ManagedProcess;
use payload_launcher::relay::{spawn_relay, RelayEvent, RelayHandle, RelayOptions};

pub use payload_launcher_test_utils::{init_tracing, with_timeout};

/// Start a relay on `process` and hand back its event receiver.
pub fn start_relay(
    process: Box<dyn ManagedProcess>,
    options: RelayOptions,
) -> (RelayHandle, mpsc::Receiver<RelayEvent>) {
    let (tx, rx) = mpsc::channel(16);
    let handle = spawn_relay(process, tx, options);
    (handle, rx)
}

/// Receive until the relay drops its sender.
pub async fn collect_events(rx: &mut mpsc::Receiver<RelayEvent>) -> Vec<RelayEvent> {
    let mut events = Vec::new();
    while let Some(ev) = rx.recv().await {
        events.push(ev);
    }
    events
}

pub fn line(s: &str) -> RelayEvent {
    RelayEvent::Line(s.to_string())
}
