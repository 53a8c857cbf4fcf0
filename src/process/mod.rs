// src/process/mod.rs

//! Handle to a launched child process.
//!
//! The relay only ever talks to a [`ManagedProcess`], so tests can hand it a
//! scripted fake while production uses [`ChildProcess`] around
//! `tokio::process::Child`.

use std::future::Future;
use std::io;
use std::pin::Pin;

use tokio::io::AsyncRead;
use tokio::process::Child;

/// Readable byte stream produced by a process (stdout, stderr, or both).
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A running child with observable output and termination.
pub trait ManagedProcess: Send {
    /// OS process id, if known.
    fn id(&self) -> Option<u32>;

    /// Take the primary output stream. Returns `None` once taken.
    fn take_output(&mut self) -> Option<OutputStream>;

    /// Take the separate stderr stream, if the process has one.
    fn take_error_output(&mut self) -> Option<OutputStream>;

    /// Wait for the process to exit.
    ///
    /// Resolves to the exit code, or `None` if the process was terminated by
    /// a signal.
    fn wait(&mut self) -> BoxFuture<'_, io::Result<Option<i32>>>;

    /// Forcefully terminate the process.
    fn kill(&mut self) -> BoxFuture<'_, io::Result<()>>;
}

/// Real process backed by `tokio::process::Child`.
pub struct ChildProcess {
    child: Child,
    output: Option<OutputStream>,
    error_output: Option<OutputStream>,
}

impl ChildProcess {
    pub fn new(child: Child, output: Option<OutputStream>, error_output: Option<OutputStream>) -> Self {
        Self {
            child,
            output,
            error_output,
        }
    }
}

impl std::fmt::Debug for ChildProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildProcess")
            .field("pid", &self.child.id())
            .field("output_taken", &self.output.is_none())
            .field("error_output_taken", &self.error_output.is_none())
            .finish()
    }
}

impl ManagedProcess for ChildProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn take_output(&mut self) -> Option<OutputStream> {
        self.output.take()
    }

    fn take_error_output(&mut self) -> Option<OutputStream> {
        self.error_output.take()
    }

    fn wait(&mut self) -> BoxFuture<'_, io::Result<Option<i32>>> {
        Box::pin(async move {
            let status = self.child.wait().await?;
            Ok(status.code())
        })
    }

    fn kill(&mut self) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(self.child.kill())
    }
}
