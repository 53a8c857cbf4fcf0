// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `payload-launcher`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "payload-launcher",
    version,
    about = "Install bundled payload binaries, launch one, and relay its output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PAYLOAD_LAUNCHER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the config and print the plan without installing or launching.
    #[arg(long)]
    pub dry_run: bool,

    /// Install payloads, then exit without launching.
    #[arg(long)]
    pub install_only: bool,

    /// Relay stderr as its own stream, overriding `combine_stderr`.
    #[arg(long)]
    pub separate_stderr: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
