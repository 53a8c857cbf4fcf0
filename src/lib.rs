// src/lib.rs

pub mod assets;
pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod install;
pub mod launch;
pub mod logging;
pub mod process;
pub mod relay;
pub mod sink;
pub mod types;

use std::future::Future;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::assets::{AssetStore, DirAssetStore};
use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::config::model::ConfigFile;
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::install::{install, InstalledPayload};
use crate::launch::{current_env, launch, ProcessSpawner, TokioSpawner};
use crate::relay::{spawn_relay, RelayEvent, DEFAULT_EVENT_CAPACITY};
use crate::sink::{drain_events, render_launch_failure, DrainSummary, OutputSink, StdoutSink};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - payload installation (off the async worker threads)
/// - process launch
/// - the output relay, drained into stdout
/// - Ctrl-C → relay cancellation
///
/// Returns the exit status `main` should use.
pub async fn run(args: CliArgs) -> Result<i32> {
    let mut sink = StdoutSink;
    run_with_sink(args, &mut sink).await
}

/// [`run`] with the output sink supplied by the caller.
///
/// Any failure before launch (config, install) is written to `sink` as well
/// as returned.
pub async fn run_with_sink<S>(args: CliArgs, sink: &mut S) -> Result<i32>
where
    S: OutputSink + ?Sized,
{
    let mut cfg = match load_and_validate(&args.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            sink.append(&render_launch_failure(&err));
            return Err(err);
        }
    };
    if args.separate_stderr {
        cfg.launch.combine_stderr = false;
    }

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(0);
    }

    let assets = DirAssetStore::new(cfg.install.asset_dir.clone());
    if let Err(err) = install_payloads(&cfg, assets, RealFileSystem).await {
        sink.append(&render_launch_failure(&err));
        return Err(err);
    }

    if args.install_only {
        info!("install-only mode; not launching");
        return Ok(0);
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    let summary = supervise(&cfg, &TokioSpawner, current_env(), sink, shutdown).await?;

    Ok(summary.exit_code.unwrap_or(1))
}

/// Install every configured payload on the blocking thread pool.
pub async fn install_payloads<A, F>(
    cfg: &ConfigFile,
    assets: A,
    fs: F,
) -> Result<Vec<InstalledPayload>>
where
    A: AssetStore + 'static,
    F: FileSystem + 'static,
{
    let names = cfg.install.payloads.clone();
    let dest_dir = cfg.install.dest_dir.clone();
    let mode = cfg.install.mode;

    let installed = tokio::task::spawn_blocking(move || {
        install(&names, &assets, &fs, &dest_dir, mode)
    })
    .await
    .map_err(anyhow::Error::from)??;

    Ok(installed)
}

/// Launch the configured target and relay its output into `sink` until the
/// relay finishes.
///
/// `shutdown` resolving cancels the relay (the process is killed and its
/// exit still reported). A launch failure is written to the sink and
/// returned; no relay is started in that case.
pub async fn supervise<I, S, Sh>(
    cfg: &ConfigFile,
    spawner: &dyn ProcessSpawner,
    base_env: I,
    sink: &mut S,
    shutdown: Sh,
) -> Result<DrainSummary>
where
    I: IntoIterator<Item = (String, String)>,
    S: OutputSink + ?Sized,
    Sh: Future<Output = ()>,
{
    let process = match launch(
        spawner,
        &cfg.target_path(),
        &cfg.launch_args(),
        base_env,
        &cfg.search_path_entries(),
        cfg.stderr_mode(),
    ) {
        Ok(p) => p,
        Err(err) => {
            sink.append(&render_launch_failure(&err));
            return Err(err.into());
        }
    };

    let (tx, mut rx) = mpsc::channel::<RelayEvent>(DEFAULT_EVENT_CAPACITY);
    let mut relay = spawn_relay(process, tx, cfg.relay_options());

    let summary = {
        let drain = drain_events(&mut rx, sink);
        tokio::pin!(drain);
        tokio::pin!(shutdown);

        tokio::select! {
            summary = &mut drain => summary,
            _ = &mut shutdown => {
                info!("shutdown requested; cancelling relay");
                relay.cancel();
                (&mut drain).await
            }
        }
    };

    relay.join().await.map_err(anyhow::Error::from)?;
    debug!(?summary, "supervision finished");
    Ok(summary)
}

/// Simple dry-run output: print the install and launch plan.
fn print_dry_run(cfg: &ConfigFile) {
    println!("payload-launcher dry-run");
    println!("  install.asset_dir = {:?}", cfg.install.asset_dir);
    println!("  install.dest_dir = {:?}", cfg.install.dest_dir);
    println!("  install.mode = {:?}", cfg.install.mode);
    println!();

    println!("payloads ({}):", cfg.install.payloads.len());
    for name in cfg.install.payloads.iter() {
        println!("  - {name}");
    }
    println!();

    println!("launch:");
    println!("  program: {}", cfg.target_path().display());
    println!("  args: {:?}", cfg.launch_args());
    println!("  search path += {:?}", cfg.search_path_entries());
    println!("  stderr: {:?}", cfg.stderr_mode());
    if let Some(timeout) = cfg.exit_timeout() {
        println!("  exit_timeout: {timeout:?}");
    }

    debug!("dry-run complete (nothing installed or launched)");
}
