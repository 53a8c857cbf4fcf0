// src/relay/mod.rs

//! Output relay.
//!
//! Owns a launched [`ManagedProcess`] for its whole lifetime on a background
//! Tokio task:
//! - reads its output incrementally and emits one [`RelayEvent::Line`] per
//!   line (a final unterminated line included),
//! - emits [`RelayEvent::StreamClosed`] at end-of-stream,
//! - waits for exit and emits [`RelayEvent::ProcessExited`].
//!
//! Events go out over an mpsc channel; whoever owns the display drains it
//! (see [`crate::sink`]). Failures inside the task become
//! [`RelayEvent::RelayError`] rather than panics.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

use crate::process::ManagedProcess;
use crate::types::StderrMode;

pub mod event;
pub mod relay_loop;

pub use event::{RelayEvent, RelayFailure, RelayState};

use relay_loop::Relay;

/// Default capacity of the relay event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct RelayOptions {
    /// How lines read from a separate stderr pipe are reported.
    pub stderr_mode: StderrMode,
    /// Give up waiting for exit after this long and kill the process.
    pub exit_timeout: Option<Duration>,
}

/// Supervisor-side handle to a running relay.
///
/// Dropping the handle does not stop the relay.
#[derive(Debug)]
pub struct RelayHandle {
    cancel: Option<oneshot::Sender<()>>,
    state: watch::Receiver<RelayState>,
    task: JoinHandle<()>,
}

impl RelayHandle {
    /// Ask the relay to stop: it closes the output stream, kills the
    /// process, and reports the exit.
    ///
    /// Returns `false` if cancellation was already requested or the relay
    /// already finished.
    pub fn cancel(&mut self) -> bool {
        match self.cancel.take() {
            Some(tx) => {
                let sent = tx.send(()).is_ok();
                if !sent {
                    debug!("relay already finished while cancelling");
                }
                sent
            }
            None => false,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RelayState {
        *self.state.borrow()
    }

    /// Wait until the relay reaches `target`.
    ///
    /// Returns the state actually observed, which is `Exited` if the relay
    /// finished without ever passing through `target`.
    pub async fn wait_for_state(&mut self, target: RelayState) -> RelayState {
        let observed = match self
            .state
            .wait_for(|s| *s == target || *s == RelayState::Exited)
            .await
        {
            Ok(state) => Some(*state),
            Err(_) => None,
        };
        observed.unwrap_or_else(|| *self.state.borrow())
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the relay task to complete.
    pub async fn join(self) -> Result<(), JoinError> {
        self.task.await
    }
}

/// Start relaying `process` onto `events` in a background task.
pub fn spawn_relay(
    process: Box<dyn ManagedProcess>,
    events: mpsc::Sender<RelayEvent>,
    options: RelayOptions,
) -> RelayHandle {
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let (state_tx, state_rx) = watch::channel(RelayState::Idle);

    let relay = Relay::new(process, events, state_tx, options);
    let task = tokio::spawn(relay.run(cancel_rx));

    RelayHandle {
        cancel: Some(cancel_tx),
        state: state_rx,
        task,
    }
}
