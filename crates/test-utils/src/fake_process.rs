use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, Notify};

use payload_launcher::process::{BoxFuture, ManagedProcess, OutputStream};

use crate::streams::{bytes_stream, chunked_stream};

enum Exit {
    Code(Option<i32>),
    OnSignal(oneshot::Receiver<Option<i32>>),
    Never,
    Fail(io::ErrorKind),
}

/// Observes a `FakeProcess` after it has been handed to the relay.
#[derive(Debug, Clone, Default)]
pub struct FakeProcessProbe {
    killed: Arc<AtomicBool>,
    wait_calls: Arc<AtomicUsize>,
}

impl FakeProcessProbe {
    pub fn was_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    pub fn wait_calls(&self) -> usize {
        self.wait_calls.load(Ordering::SeqCst)
    }
}

/// A scripted stand-in for a child process.
///
/// Defaults: no output streams, exits immediately with code 0.
pub struct FakeProcess {
    output: Option<OutputStream>,
    error_output: Option<OutputStream>,
    exit: Exit,
    probe: FakeProcessProbe,
    kill_notify: Arc<Notify>,
}

impl Default for FakeProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeProcess {
    pub fn new() -> Self {
        Self {
            output: None,
            error_output: None,
            exit: Exit::Code(Some(0)),
            probe: FakeProcessProbe::default(),
            kill_notify: Arc::new(Notify::new()),
        }
    }

    pub fn with_output(mut self, stream: OutputStream) -> Self {
        self.output = Some(stream);
        self
    }

    pub fn with_output_bytes(self, bytes: impl Into<Vec<u8>>) -> Self {
        self.with_output(bytes_stream(bytes))
    }

    /// Must be called inside a Tokio runtime.
    pub fn with_output_chunks<I, C>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        self.with_output(chunked_stream(chunks))
    }

    pub fn with_error_output(mut self, stream: OutputStream) -> Self {
        self.error_output = Some(stream);
        self
    }

    pub fn exit_code(mut self, code: Option<i32>) -> Self {
        self.exit = Exit::Code(code);
        self
    }

    /// Exit only when the returned sender fires (or on kill).
    pub fn exit_on_signal(mut self) -> (Self, oneshot::Sender<Option<i32>>) {
        let (tx, rx) = oneshot::channel();
        self.exit = Exit::OnSignal(rx);
        (self, tx)
    }

    /// Never exit unless killed.
    pub fn never_exits(mut self) -> Self {
        self.exit = Exit::Never;
        self
    }

    pub fn failing_wait(mut self, kind: io::ErrorKind) -> Self {
        self.exit = Exit::Fail(kind);
        self
    }

    pub fn probe(&self) -> FakeProcessProbe {
        self.probe.clone()
    }

    pub fn boxed(self) -> Box<dyn ManagedProcess> {
        Box::new(self)
    }
}

impl ManagedProcess for FakeProcess {
    fn id(&self) -> Option<u32> {
        Some(4242)
    }

    fn take_output(&mut self) -> Option<OutputStream> {
        self.output.take()
    }

    fn take_error_output(&mut self) -> Option<OutputStream> {
        self.error_output.take()
    }

    fn wait(&mut self) -> BoxFuture<'_, io::Result<Option<i32>>> {
        Box::pin(async move {
            self.probe.wait_calls.fetch_add(1, Ordering::SeqCst);
            let killed = self.probe.killed.load(Ordering::SeqCst);

            match &mut self.exit {
                Exit::Code(code) => Ok(*code),
                Exit::Fail(kind) => Err(io::Error::new(*kind, "injected wait failure")),
                _ if killed => Ok(None),
                Exit::Never => {
                    self.kill_notify.notified().await;
                    Ok(None)
                }
                Exit::OnSignal(rx) => {
                    let code = tokio::select! {
                        res = rx => res.unwrap_or(None),
                        _ = self.kill_notify.notified() => None,
                    };
                    self.exit = Exit::Code(code);
                    Ok(code)
                }
            }
        })
    }

    fn kill(&mut self) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(async move {
            self.probe.killed.store(true, Ordering::SeqCst);
            if matches!(self.exit, Exit::Never | Exit::OnSignal(_)) {
                self.exit = Exit::Code(None);
            }
            self.kill_notify.notify_one();
            Ok(())
        })
    }
}
