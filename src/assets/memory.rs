// src/assets/memory.rs

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};

use super::{AssetError, AssetStore};

#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    assets: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an asset.
    pub fn add_asset(&self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        let mut assets = self.assets.lock().unwrap_or_else(|p| p.into_inner());
        assets.insert(name.into(), content.into());
    }

    pub fn with_asset(self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.add_asset(name, content);
        self
    }
}

impl AssetStore for MemoryAssetStore {
    fn open(&self, name: &str) -> Result<Box<dyn Read + Send>, AssetError> {
        let assets = self.assets.lock().unwrap_or_else(|p| p.into_inner());
        match assets.get(name) {
            Some(content) => Ok(Box::new(Cursor::new(content.clone()))),
            None => Err(AssetError::NotFound(name.to_string())),
        }
    }
}
