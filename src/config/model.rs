// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::launch::TargetAddress;
use crate::relay::RelayOptions;
use crate::types::{InstallMode, StderrMode};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [install]
/// asset_dir = "assets"
/// dest_dir = "payloads"
/// payloads = ["diffuzz-client", "lscpu"]
///
/// [launch]
/// target = "diffuzz-client"
/// target_host = "192.168.10.133"
/// target_port = 1337
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub install: InstallSection,
    pub launch: LaunchSection,
}

/// `[install]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallSection {
    /// Directory holding the bundled payload assets.
    #[serde(default = "default_asset_dir")]
    pub asset_dir: PathBuf,

    /// Writable directory the payloads are installed into.
    #[serde(default = "default_dest_dir")]
    pub dest_dir: PathBuf,

    /// Payload names, installed in this order.
    pub payloads: Vec<String>,

    /// `"if_changed"` (default) or `"always"`.
    #[serde(default)]
    pub mode: InstallMode,
}

fn default_asset_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_dest_dir() -> PathBuf {
    PathBuf::from("payloads")
}

/// `[launch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchSection {
    /// Which installed payload to run.
    pub target: String,

    pub target_host: String,

    /// Kept wide so out-of-range values get a proper validation message.
    pub target_port: i64,

    /// Merge stderr into stdout (default) or relay it separately.
    #[serde(default = "default_combine_stderr")]
    pub combine_stderr: bool,

    /// Search-path entries appended after the install directory.
    #[serde(default)]
    pub extra_path_entries: Vec<String>,

    /// Extra arguments passed after `<host> <port>`.
    #[serde(default)]
    pub args: Vec<String>,

    /// Optional exit-wait limit such as `"30s"` or `"500ms"`.
    #[serde(default)]
    pub exit_timeout: Option<String>,
}

fn default_combine_stderr() -> bool {
    true
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>`, so every instance has
/// passed validation.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub install: InstallSection,
    pub launch: LaunchSection,
    target: TargetAddress,
    exit_timeout: Option<Duration>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        install: InstallSection,
        launch: LaunchSection,
        target: TargetAddress,
        exit_timeout: Option<Duration>,
    ) -> Self {
        Self {
            install,
            launch,
            target,
            exit_timeout,
        }
    }

    pub fn target_address(&self) -> &TargetAddress {
        &self.target
    }

    /// Installed location of the launch target.
    pub fn target_path(&self) -> PathBuf {
        self.install.dest_dir.join(&self.launch.target)
    }

    /// Full argument list: `<host> <port> [args...]`.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = self.target.to_args();
        args.extend(self.launch.args.iter().cloned());
        args
    }

    /// Entries appended to the child's search path: install dir first.
    pub fn search_path_entries(&self) -> Vec<String> {
        let mut entries = vec![self.install.dest_dir.to_string_lossy().into_owned()];
        entries.extend(self.launch.extra_path_entries.iter().cloned());
        entries
    }

    pub fn stderr_mode(&self) -> StderrMode {
        StderrMode::from_combine_flag(self.launch.combine_stderr)
    }

    pub fn exit_timeout(&self) -> Option<Duration> {
        self.exit_timeout
    }

    pub fn relay_options(&self) -> RelayOptions {
        RelayOptions {
            stderr_mode: self.stderr_mode(),
            exit_timeout: self.exit_timeout,
        }
    }
}
