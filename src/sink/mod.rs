// src/sink/mod.rs

//! Display side of the relay.
//!
//! The relay never touches the display itself. It sends [`RelayEvent`]s
//! over a channel and the display-owning context drains them with
//! [`drain_events`], applying each one to an [`OutputSink`].

use std::fmt::Display;
use std::io::{self, Write};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::relay::{RelayEvent, RelayFailure};

/// Something that accepts text for display.
pub trait OutputSink {
    fn append(&mut self, text: &str);
}

/// Text appended to the sink for a single event.
pub fn render_event(event: &RelayEvent) -> String {
    match event {
        RelayEvent::Line(line) => format!("{line}\n"),
        RelayEvent::ErrorLine(line) => format!("[stderr] {line}\n"),
        RelayEvent::StreamClosed => "[output stream closed]\n[waiting for process]\n".to_string(),
        RelayEvent::ProcessExited { code: Some(code) } => {
            format!("[process exited with code {code}]\n")
        }
        RelayEvent::ProcessExited { code: None } => "[process terminated by signal]\n".to_string(),
        RelayEvent::Cancelled => "[relay cancelled]\n".to_string(),
        RelayEvent::RelayError(failure) => format!("[relay error: {failure}]\n"),
    }
}

/// Message shown instead of output when nothing could be launched.
pub fn render_launch_failure(cause: &dyn Display) -> String {
    format!("[launch failed: {cause}]\n")
}

/// Summary of a fully drained relay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub lines: usize,
    pub stream_closed: bool,
    pub exited: bool,
    pub exit_code: Option<i32>,
    pub cancelled: bool,
    pub failure: Option<RelayFailure>,
}

/// Apply every event to `sink` until the relay drops its sender.
pub async fn drain_events<S>(events: &mut mpsc::Receiver<RelayEvent>, sink: &mut S) -> DrainSummary
where
    S: OutputSink + ?Sized,
{
    let mut summary = DrainSummary::default();

    while let Some(event) = events.recv().await {
        sink.append(&render_event(&event));

        match event {
            RelayEvent::Line(_) | RelayEvent::ErrorLine(_) => summary.lines += 1,
            RelayEvent::StreamClosed => summary.stream_closed = true,
            RelayEvent::ProcessExited { code } => {
                summary.exited = true;
                summary.exit_code = code;
            }
            RelayEvent::Cancelled => summary.cancelled = true,
            RelayEvent::RelayError(failure) => summary.failure = Some(failure),
        }
    }

    debug!(?summary, "relay event channel drained");
    summary
}

/// Writes to the process's own stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn append(&mut self, text: &str) {
        let mut out = io::stdout().lock();
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
            warn!(error = %e, "failed writing relayed output to stdout");
        }
    }
}

/// Accumulates everything appended; handy for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub text: String,
    pub appends: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<&str> {
        self.text.lines().collect()
    }
}

impl OutputSink for MemorySink {
    fn append(&mut self, text: &str) {
        self.text.push_str(text);
        self.appends += 1;
    }
}
