//! Storage access seam.
//!
//! All file and network access goes through the [`Storage`] trait so the
//! analysis and serialization layers stay independent of where sources and
//! output records actually live. [`FsStorage`] is the local-filesystem
//! implementation; remote blob stores plug in behind the same trait. An
//! [`Endpoint`] is a storage handle rooted at a prefix, used for writing a
//! batch of keyed records into one destination.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Storage access errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    fn io(path: &str, source: io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
}

/// Byte-oriented access to a storage backend.
pub trait Storage: Send + Sync {
    /// Read the full contents at `path`.
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Write `data` at `path`, creating intermediate directories as needed.
    fn put(&self, path: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Whether `path` names a directory-like container.
    fn is_dir(&self, path: &str) -> bool;

    /// List the file paths directly under `path`, sorted.
    fn list(&self, path: &str) -> Result<Vec<String>, StorageError>;
}

/// Local-filesystem storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for FsStorage {
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        fs::read(path).map_err(|e| StorageError::io(path, e))
    }

    fn put(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(path, e))?;
        }
        fs::write(path, data).map_err(|e| StorageError::io(path, e))
    }

    fn is_dir(&self, path: &str) -> bool {
        Path::new(path).is_dir()
    }

    fn list(&self, path: &str) -> Result<Vec<String>, StorageError> {
        let entries = fs::read_dir(path).map_err(|e| StorageError::io(path, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(path, e))?;
            if entry.path().is_file() {
                paths.push(entry.path().to_string_lossy().into_owned());
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// A storage handle rooted at a prefix.
///
/// Keys are joined onto the root, so a batch of records lands together in
/// one destination.
#[derive(Clone)]
pub struct Endpoint {
    storage: Arc<dyn Storage>,
    root: String,
}

impl Endpoint {
    pub fn new(storage: Arc<dyn Storage>, root: impl Into<String>) -> Self {
        Self {
            storage,
            root: root.into(),
        }
    }

    /// The root prefix.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Write a keyed record under the root.
    pub fn put(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.storage.put(&self.join(key), data)
    }

    /// Read a keyed record from under the root.
    pub fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.storage.get(&self.join(key))
    }

    fn join(&self, key: &str) -> String {
        format!("{}/{}", self.root.trim_end_matches('/'), key)
    }
}
