// src/relay/relay_loop.rs

//! The relay task body: read lines, report stream end, wait for exit.

use std::future::Future;
use std::io;
use std::pin::Pin;

use tokio::io::{AsyncBufReadExt, BufReader, Split};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::process::{ManagedProcess, OutputStream};
use crate::types::StderrMode;

use super::event::{RelayEvent, RelayFailure, RelayState};
use super::RelayOptions;

type LineSplitter = Split<BufReader<OutputStream>>;
type CancelSignal = Pin<Box<dyn Future<Output = ()> + Send>>;

enum ReadOutcome {
    Closed,
    Failed(io::Error),
    Cancelled,
}

enum WaitOutcome {
    Exited(Option<i32>),
    Failed(io::Error),
    TimedOut,
    Cancelled,
}

pub(super) struct Relay {
    process: Box<dyn ManagedProcess>,
    events: mpsc::Sender<RelayEvent>,
    state: watch::Sender<RelayState>,
    options: RelayOptions,
    lines: u64,
    sink_gone: bool,
}

/// Resolves on an explicit cancel; a dropped sender never resolves.
fn cancel_signal(rx: oneshot::Receiver<()>) -> CancelSignal {
    Box::pin(async move {
        if rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    })
}

async fn next_segment(reader: &mut Option<LineSplitter>) -> io::Result<Option<Vec<u8>>> {
    match reader {
        Some(r) => r.next_segment().await,
        None => std::future::pending().await,
    }
}

/// Turn a raw segment (delimiter already removed) into display text.
pub(super) fn decode_line(mut bytes: Vec<u8>) -> String {
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

impl Relay {
    pub(super) fn new(
        process: Box<dyn ManagedProcess>,
        events: mpsc::Sender<RelayEvent>,
        state: watch::Sender<RelayState>,
        options: RelayOptions,
    ) -> Self {
        Self {
            process,
            events,
            state,
            options,
            lines: 0,
            sink_gone: false,
        }
    }

    pub(super) async fn run(mut self, cancel_rx: oneshot::Receiver<()>) {
        let mut cancel = cancel_signal(cancel_rx);
        let pid = self.process.id();
        info!(pid = ?pid, "output relay started");

        let out = self
            .process
            .take_output()
            .map(|s| BufReader::new(s).split(b'\n'));
        let err = self
            .process
            .take_error_output()
            .map(|s| BufReader::new(s).split(b'\n'));

        self.set_state(RelayState::Reading);
        match self.read_lines(out, err, &mut cancel).await {
            ReadOutcome::Closed => {
                self.set_state(RelayState::StreamEnded);
                self.emit(RelayEvent::StreamClosed).await;
            }
            ReadOutcome::Failed(e) => {
                warn!(pid = ?pid, error = %e, "failed reading process output");
                self.emit(RelayEvent::RelayError(RelayFailure::StreamRead(e.to_string())))
                    .await;
            }
            ReadOutcome::Cancelled => {
                self.terminate_cancelled().await;
                return;
            }
        }

        self.set_state(RelayState::Waiting);
        match self.wait_for_exit(&mut cancel).await {
            WaitOutcome::Exited(code) => {
                info!(pid = ?pid, exit_code = ?code, lines = self.lines, "payload process exited");
                self.emit(RelayEvent::ProcessExited { code }).await;
                self.set_state(RelayState::Exited);
            }
            WaitOutcome::Failed(e) => {
                warn!(pid = ?pid, error = %e, "failed waiting for process exit");
                self.emit(RelayEvent::RelayError(RelayFailure::Wait(e.to_string())))
                    .await;
                self.set_state(RelayState::Exited);
            }
            WaitOutcome::TimedOut => {
                // Only reachable with a configured timeout.
                let timeout = self.options.exit_timeout.unwrap_or_default();
                warn!(pid = ?pid, ?timeout, "process did not exit in time; killing");
                self.emit(RelayEvent::RelayError(RelayFailure::WaitTimeout(timeout)))
                    .await;
                self.kill_and_reap().await;
            }
            WaitOutcome::Cancelled => self.terminate_cancelled().await,
        }
    }

    /// Pull lines from every open stream until all of them close.
    ///
    /// Both streams are polled from this one task, so events keep a single
    /// total order and each stream's lines stay in write order.
    async fn read_lines(
        &mut self,
        mut out: Option<LineSplitter>,
        mut err: Option<LineSplitter>,
        cancel: &mut CancelSignal,
    ) -> ReadOutcome {
        loop {
            if out.is_none() && err.is_none() {
                debug!(lines = self.lines, "all output streams closed");
                return ReadOutcome::Closed;
            }

            tokio::select! {
                biased;

                _ = &mut *cancel => return ReadOutcome::Cancelled,

                seg = next_segment(&mut out), if out.is_some() => match seg {
                    Ok(Some(bytes)) => {
                        self.lines += 1;
                        self.emit(RelayEvent::Line(decode_line(bytes))).await;
                    }
                    Ok(None) => {
                        debug!("stdout reached end-of-stream");
                        out = None;
                    }
                    Err(e) => return ReadOutcome::Failed(e),
                },

                seg = next_segment(&mut err), if err.is_some() => match seg {
                    Ok(Some(bytes)) => {
                        self.lines += 1;
                        let text = decode_line(bytes);
                        let event = match self.options.stderr_mode {
                            StderrMode::Combined => RelayEvent::Line(text),
                            StderrMode::Separate => RelayEvent::ErrorLine(text),
                        };
                        self.emit(event).await;
                    }
                    Ok(None) => {
                        debug!("stderr reached end-of-stream");
                        err = None;
                    }
                    Err(e) => return ReadOutcome::Failed(e),
                },
            }
        }
    }

    async fn wait_for_exit(&mut self, cancel: &mut CancelSignal) -> WaitOutcome {
        let timeout = self.options.exit_timeout;
        let exit = self.process.wait();
        let wait = async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, exit).await.ok(),
                None => Some(exit.await),
            }
        };

        tokio::select! {
            biased;

            _ = &mut *cancel => WaitOutcome::Cancelled,

            res = wait => match res {
                Some(Ok(code)) => WaitOutcome::Exited(code),
                Some(Err(e)) => WaitOutcome::Failed(e),
                None => WaitOutcome::TimedOut,
            },
        }
    }

    async fn terminate_cancelled(&mut self) {
        info!(pid = ?self.process.id(), "relay cancelled; killing payload process");
        self.emit(RelayEvent::Cancelled).await;
        self.kill_and_reap().await;
    }

    /// Kill the child, then report how it went away.
    async fn kill_and_reap(&mut self) {
        if let Err(e) = self.process.kill().await {
            warn!(pid = ?self.process.id(), error = %e, "failed to kill payload process");
        }
        match self.process.wait().await {
            Ok(code) => self.emit(RelayEvent::ProcessExited { code }).await,
            Err(e) => {
                self.emit(RelayEvent::RelayError(RelayFailure::Wait(e.to_string())))
                    .await
            }
        }
        self.set_state(RelayState::Exited);
    }

    async fn emit(&mut self, event: RelayEvent) {
        if self.sink_gone {
            return;
        }
        if self.events.send(event).await.is_err() {
            debug!("relay event receiver dropped; discarding further events");
            self.sink_gone = true;
        }
    }

    fn set_state(&mut self, next: RelayState) {
        let prev = self.state.send_replace(next);
        debug!(from = %prev, to = %next, "relay state transition");
    }
}
