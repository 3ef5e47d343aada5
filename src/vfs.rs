//! In-memory virtual filesystem.
//!
//! The host pushes description files in with [`VirtualFs::inject`]; the chain
//! loader reads them back. Entries are shared as `Arc<[u8]>`, so overwriting a
//! path never disturbs a reader that already holds the previous content.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

use crate::error::{Error, Result};

#[derive(Default)]
pub struct VirtualFs {
    files: RwLock<HashMap<String, Arc<[u8]>>>,
}

impl VirtualFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `content` under `path`, replacing any previous entry.
    pub fn inject(&self, path: &str, content: impl Into<Arc<[u8]>>) {
        let key = normalize_path(path);
        let content = content.into();
        debug!("vfs: inject '{}' ({} bytes)", key, content.len());
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, content);
    }

    pub fn read(&self, path: &str) -> Result<Arc<[u8]>> {
        let key = normalize_path(path);
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .ok_or(Error::NotFound { path: key })
    }

    pub fn read_to_string(&self, path: &str) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| {
            Error::parse(format!(
                "'{}' is not valid UTF-8: {e}",
                normalize_path(path)
            ))
        })
    }

    pub fn exists(&self, path: &str) -> bool {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&normalize_path(path))
    }

    /// Remove an entry, returning its content if it existed.
    pub fn remove(&self, path: &str) -> Option<Arc<[u8]>> {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&normalize_path(path))
    }

    /// Sorted list of every stored path starting with `prefix`.
    pub fn list(&self, prefix: &str) -> Vec<String> {
        let prefix = normalize_path(prefix);
        let mut paths: Vec<String> = self
            .files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.files.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for VirtualFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualFs")
            .field("file_count", &self.len())
            .finish()
    }
}

/// Canonical key for a path: forward slashes, no repeated separators, no
/// leading `./`, no surrounding whitespace.
pub fn normalize_path(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");
    let mut out = String::with_capacity(unified.len());
    let mut prev_slash = false;
    for c in unified.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }

    let mut trimmed = out.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.to_string()
}
