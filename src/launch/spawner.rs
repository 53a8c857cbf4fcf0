// src/launch/spawner.rs

//! Production spawner built on `tokio::process::Command`.
//!
//! Must be called from within a Tokio runtime.

use std::io;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::process::{ChildProcess, ManagedProcess, OutputStream};
use crate::types::StderrMode;

use super::{LaunchSpec, ProcessSpawner};

#[derive(Debug, Clone, Default)]
pub struct TokioSpawner;

impl ProcessSpawner for TokioSpawner {
    fn spawn(&self, spec: &LaunchSpec) -> io::Result<Box<dyn ManagedProcess>> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .env_clear()
            .envs(&spec.env)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let process = match spec.stderr {
            StderrMode::Separate => spawn_separate(cmd)?,
            StderrMode::Combined => spawn_combined(cmd)?,
        };
        Ok(Box::new(process))
    }
}

fn spawn_separate(mut cmd: Command) -> io::Result<ChildProcess> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn()?;

    let output = child.stdout.take().map(|s| Box::new(s) as OutputStream);
    let error_output = child.stderr.take().map(|s| Box::new(s) as OutputStream);
    Ok(ChildProcess::new(child, output, error_output))
}

/// Point stdout and stderr at the write end of one pipe, so the reader sees
/// both in the order the child wrote them.
#[cfg(unix)]
fn spawn_combined(mut cmd: Command) -> io::Result<ChildProcess> {
    use std::fs::File;
    use std::os::fd::OwnedFd;
    use tokio::net::unix::pipe;

    let (reader, writer) = io::pipe()?;
    cmd.stdout(writer.try_clone()?).stderr(writer);
    let child = cmd.spawn()?;
    // The command still owns the parent's copies of the write end; the reader
    // only sees end-of-stream once those are gone too.
    drop(cmd);

    let receiver = pipe::Receiver::from_file(File::from(OwnedFd::from(reader)))?;
    debug!(pid = ?child.id(), "spawned child with stderr merged into stdout");
    Ok(ChildProcess::new(child, Some(Box::new(receiver)), None))
}

/// Without descriptor plumbing both pipes are handed out; the relay reports
/// stderr lines as ordinary output in combined mode.
#[cfg(not(unix))]
fn spawn_combined(cmd: Command) -> io::Result<ChildProcess> {
    debug!("combined stderr falls back to two pipes on this platform");
    spawn_separate(cmd)
}
