// src/install/mod.rs

//! Payload installer.
//!
//! Copies named assets out of an [`AssetStore`] into the writable install
//! directory and marks each copy executable. Payloads are processed in the
//! order given; the first failure aborts the whole sequence (fail-fast) and
//! is returned to the caller.
//!
//! With [`InstallMode::IfChanged`] an existing destination is only rewritten
//! when its content hash differs from the bundled asset, so a stale binary
//! from an older bundle is always replaced while an identical one is left
//! alone.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::assets::{AssetError, AssetStore};
use crate::fs::FileSystem;
pub use crate::types::InstallMode;

pub mod hash;

use hash::{compute_file_hash, hash_reader, hash_stream};

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("asset not found: {name}")]
    AssetNotFound { name: String },

    #[error("invalid payload name '{name}': must be a plain file name")]
    InvalidName { name: String },

    #[error("installing payload '{name}': {cause}")]
    Io {
        name: String,
        #[source]
        cause: io::Error,
    },
}

impl InstallError {
    /// Name of the payload that failed.
    pub fn name(&self) -> &str {
        match self {
            InstallError::AssetNotFound { name }
            | InstallError::InvalidName { name }
            | InstallError::Io { name, .. } => name,
        }
    }

    fn io(name: &str, cause: io::Error) -> Self {
        InstallError::Io {
            name: name.to_string(),
            cause,
        }
    }
}

/// What happened to a payload during installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    /// Bytes were copied from the asset store.
    Copied,
    /// The destination already matched the asset; only the mode was refreshed.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPayload {
    pub name: String,
    pub path: PathBuf,
    pub status: InstallStatus,
    /// blake3 hex digest of the installed content.
    pub hash: String,
}

/// Install every payload in `names` into `dest_dir`, in order.
///
/// Returns the installed payloads on success. On the first failure, the
/// remaining payloads are not attempted.
pub fn install<I, S>(
    names: I,
    assets: &dyn AssetStore,
    fs: &dyn FileSystem,
    dest_dir: &Path,
    mode: InstallMode,
) -> Result<Vec<InstalledPayload>, InstallError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut installed = Vec::new();
    for name in names {
        installed.push(install_payload(name.as_ref(), assets, fs, dest_dir, mode)?);
    }
    info!(count = installed.len(), dest_dir = ?dest_dir, "payload installation complete");
    Ok(installed)
}

/// Install a single payload as `<dest_dir>/<name>`.
pub fn install_payload(
    name: &str,
    assets: &dyn AssetStore,
    fs: &dyn FileSystem,
    dest_dir: &Path,
    mode: InstallMode,
) -> Result<InstalledPayload, InstallError> {
    if !is_plain_file_name(name) {
        return Err(InstallError::InvalidName {
            name: name.to_string(),
        });
    }

    // Open the asset before touching the destination so a missing asset
    // never leaves an empty file behind.
    let mut source = open_asset(assets, name)?;
    let dest = dest_dir.join(name);

    fs.create_dir_all(dest_dir)
        .map_err(|e| InstallError::io(name, e))?;

    if mode == InstallMode::IfChanged && fs.is_file(&dest) {
        let asset_hash = hash_reader(&mut source).map_err(|e| InstallError::io(name, e))?;
        match compute_file_hash(fs, &dest) {
            Ok(existing) if existing == asset_hash => {
                fs.set_executable(&dest)
                    .map_err(|e| InstallError::io(name, e))?;
                info!(payload = %name, path = ?dest, "payload unchanged; skipping copy");
                return Ok(InstalledPayload {
                    name: name.to_string(),
                    path: dest,
                    status: InstallStatus::Unchanged,
                    hash: asset_hash,
                });
            }
            Ok(existing) => {
                debug!(payload = %name, old = %existing, new = %asset_hash, "installed payload is stale");
            }
            Err(e) => {
                warn!(payload = %name, error = %e, "could not hash installed payload; reinstalling");
            }
        }
        // The first stream was consumed by hashing.
        source = open_asset(assets, name)?;
    }

    let hash = copy_to_destination(name, &mut source, fs, &dest)?;

    fs.set_executable(&dest)
        .map_err(|e| InstallError::io(name, e))?;

    info!(payload = %name, path = ?dest, hash = %hash, "installed payload");

    Ok(InstalledPayload {
        name: name.to_string(),
        path: dest,
        status: InstallStatus::Copied,
        hash,
    })
}

fn open_asset(assets: &dyn AssetStore, name: &str) -> Result<Box<dyn Read + Send>, InstallError> {
    assets.open(name).map_err(|e| match e {
        AssetError::NotFound(name) => InstallError::AssetNotFound { name },
        AssetError::Io { name, source } => InstallError::Io { name, cause: source },
    })
}

/// Stream `source` into a freshly truncated `dest`, hashing as we go.
///
/// A failed copy removes the partial destination file.
fn copy_to_destination(
    name: &str,
    source: &mut dyn Read,
    fs: &dyn FileSystem,
    dest: &Path,
) -> Result<String, InstallError> {
    let mut out = fs
        .create_or_truncate(dest)
        .map_err(|e| InstallError::io(name, e))?;

    match hash_stream(source, Some(out.as_mut())) {
        Ok((bytes, hash)) => {
            debug!(payload = %name, bytes, "copied payload bytes");
            Ok(hash)
        }
        Err(e) => {
            drop(out);
            if let Err(rm) = fs.remove_file(dest) {
                warn!(payload = %name, path = ?dest, error = %rm, "failed to remove partial payload");
            }
            Err(InstallError::io(name, e))
        }
    }
}

/// A payload name must name a file directly inside the install directory.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}
