// src/launch/mod.rs

//! Process launcher.
//!
//! Builds the command line and environment for a payload and starts it
//! through a [`ProcessSpawner`]:
//! - [`env`] rewrites the search-path variable so the install directory (and
//!   any extra entries) resolve bare executable names.
//! - [`spawner`] holds the production `tokio::process` implementation.
//!
//! A spawn failure is terminal for that attempt; nothing is retried.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};

use crate::process::ManagedProcess;
pub use crate::types::StderrMode;

pub mod env;
pub mod spawner;

pub use env::{build_env, current_env, search_path_separator, SEARCH_PATH_VAR};
pub use spawner::TokioSpawner;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("spawning '{}': {}", .path.display(), .cause)]
    Spawn {
        path: PathBuf,
        #[source]
        cause: io::Error,
    },

    #[error("invalid launch target: {0}")]
    InvalidTarget(String),
}

/// Fully resolved command and environment for one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Complete child environment; the parent's is not inherited on top.
    pub env: BTreeMap<String, String>,
    pub stderr: StderrMode,
}

/// Something that can turn a [`LaunchSpec`] into a running process.
pub trait ProcessSpawner: Send + Sync {
    fn spawn(&self, spec: &LaunchSpec) -> io::Result<Box<dyn ManagedProcess>>;
}

/// Network endpoint the payload is told to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddress {
    pub host: String,
    pub port: u16,
}

impl TargetAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, LaunchError> {
        let target = Self {
            host: host.into(),
            port,
        };
        target.validate()?;
        Ok(target)
    }

    pub fn validate(&self) -> Result<(), LaunchError> {
        if self.host.trim().is_empty() {
            return Err(LaunchError::InvalidTarget("target host is empty".to_string()));
        }
        if self.host.chars().any(char::is_whitespace) {
            return Err(LaunchError::InvalidTarget(format!(
                "target host '{}' contains whitespace",
                self.host
            )));
        }
        if self.port == 0 {
            return Err(LaunchError::InvalidTarget("target port must be in 1..=65535".to_string()));
        }
        Ok(())
    }

    /// Leading command-line arguments: `<host> <port>`.
    pub fn to_args(&self) -> Vec<String> {
        vec![self.host.clone(), self.port.to_string()]
    }
}

/// Launch `executable` with `args` and an environment derived from
/// `base_env` whose search path is extended by `extra_path_entries`.
pub fn launch<I>(
    spawner: &dyn ProcessSpawner,
    executable: &Path,
    args: &[String],
    base_env: I,
    extra_path_entries: &[String],
    stderr: StderrMode,
) -> Result<Box<dyn ManagedProcess>, LaunchError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let spec = LaunchSpec {
        program: executable.to_path_buf(),
        args: args.to_vec(),
        env: build_env(base_env, extra_path_entries),
        stderr,
    };

    match spawner.spawn(&spec) {
        Ok(process) => {
            info!(
                program = ?spec.program,
                args = ?spec.args,
                pid = ?process.id(),
                stderr = ?spec.stderr,
                "launched payload process"
            );
            Ok(process)
        }
        Err(cause) => {
            error!(program = ?spec.program, error = %cause, "failed to spawn payload process");
            Err(LaunchError::Spawn {
                path: spec.program,
                cause,
            })
        }
    }
}
