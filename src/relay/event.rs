// src/relay/event.rs

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Events flowing from the relay to the sink, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// One line of process output, without its terminator.
    Line(String),
    /// One line read from a separate stderr pipe.
    ErrorLine(String),
    /// All output streams reached end-of-stream.
    StreamClosed,
    /// The process terminated. `code` is `None` when killed by a signal.
    ProcessExited { code: Option<i32> },
    /// Monitoring was cancelled; the process is being killed.
    Cancelled,
    /// Something went wrong inside the relay.
    RelayError(RelayFailure),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayFailure {
    #[error("reading process output: {0}")]
    StreamRead(String),

    #[error("waiting for process exit: {0}")]
    Wait(String),

    #[error("process did not exit within {0:?}")]
    WaitTimeout(Duration),
}

/// Lifecycle of a single relay.
///
/// `Idle -> Reading -> StreamEnded -> Waiting -> Exited`; cancellation and
/// failures jump straight towards `Exited`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Reading,
    StreamEnded,
    Waiting,
    Exited,
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelayState::Idle => "idle",
            RelayState::Reading => "reading",
            RelayState::StreamEnded => "stream_ended",
            RelayState::Waiting => "waiting",
            RelayState::Exited => "exited",
        };
        f.write_str(s)
    }
}
