// src/assets/mod.rs

//! Read-only store of bundled payload assets.
//!
//! Assets are named binary blobs exposed as readable byte streams. The
//! installer never cares where they come from:
//! - [`DirAssetStore`] serves files from a directory shipped alongside the
//!   application.
//! - [`memory::MemoryAssetStore`] keeps blobs in memory (tests, embedded
//!   payloads via `include_bytes!`).

use std::fmt::Debug;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use thiserror::Error;

pub mod memory;

pub use memory::MemoryAssetStore;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("opening asset '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Abstract asset store interface.
pub trait AssetStore: Send + Sync + Debug {
    /// Open the named asset for streaming reads.
    fn open(&self, name: &str) -> Result<Box<dyn Read + Send>, AssetError>;
}

/// Asset store backed by a directory on disk.
///
/// Asset `name` maps to `<root>/<name>`.
#[derive(Debug, Clone)]
pub struct DirAssetStore {
    root: PathBuf,
}

impl DirAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetStore for DirAssetStore {
    fn open(&self, name: &str) -> Result<Box<dyn Read + Send>, AssetError> {
        let path = self.root.join(name);
        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(AssetError::NotFound(name.to_string()))
            }
            Err(source) => Err(AssetError::Io {
                name: name.to_string(),
                source,
            }),
        }
    }
}
