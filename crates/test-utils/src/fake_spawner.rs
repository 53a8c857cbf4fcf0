use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use payload_launcher::launch::{LaunchSpec, ProcessSpawner};
use payload_launcher::process::ManagedProcess;

use crate::fake_process::FakeProcess;

/// A spawner that:
/// - records every `LaunchSpec` it is asked to start
/// - hands out queued fake processes (or a default one exiting 0)
/// - optionally refuses to spawn at all.
#[derive(Default)]
pub struct RecordingSpawner {
    specs: Arc<Mutex<Vec<LaunchSpec>>>,
    queued: Mutex<VecDeque<Box<dyn ManagedProcess>>>,
    failure: Option<io::ErrorKind>,
}

impl RecordingSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(kind: io::ErrorKind) -> Self {
        Self {
            failure: Some(kind),
            ..Self::default()
        }
    }

    pub fn with_process(self, process: FakeProcess) -> Self {
        self.queued.lock().unwrap().push_back(process.boxed());
        self
    }

    /// Shared view of the recorded specs.
    pub fn specs_handle(&self) -> Arc<Mutex<Vec<LaunchSpec>>> {
        Arc::clone(&self.specs)
    }

    pub fn recorded(&self) -> Vec<LaunchSpec> {
        self.specs.lock().unwrap().clone()
    }
}

impl ProcessSpawner for RecordingSpawner {
    fn spawn(&self, spec: &LaunchSpec) -> io::Result<Box<dyn ManagedProcess>> {
        self.specs.lock().unwrap().push(spec.clone());

        if let Some(kind) = self.failure {
            return Err(io::Error::new(kind, format!("refusing to spawn {:?}", spec.program)));
        }

        let next = self.queued.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| FakeProcess::new().boxed()))
    }
}
