use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to replace {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// File-backed key-value store.
///
/// The whole map lives in memory; every mutation rewrites the file through a
/// temp file in the same directory followed by a rename, so a crash never
/// leaves a half-written file. There is no cross-process locking: last
/// writer wins.
pub struct PreferenceStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl PreferenceStore {
    /// Opens the store at `path`. A missing file is an empty store; a file that
    /// is not a JSON object is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let values = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Map<String, Value>>(&raw) {
                Ok(values) => values,
                Err(e) => {
                    warn!("Preference file {} is corrupt, starting empty: {e}", path.display());
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No preference file at {}, starting empty", path.display());
                Map::new()
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.lock()
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.lock().get(key).and_then(|v| v.as_u64())
    }

    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), StoreError> {
        self.set_many(vec![(key, value.into())])
    }

    /// Applies several writes as one file rewrite.
    pub fn set_many(&self, entries: Vec<(&str, Value)>) -> Result<(), StoreError> {
        self.update(|values| {
            for (key, value) in entries {
                values.insert(key.to_string(), value);
            }
        })
    }

    pub fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.update(|values| {
            for key in keys {
                values.remove(*key);
            }
        })
    }

    /// Edits a copy of the map and swaps it in only once the file write has
    /// succeeded, so memory never holds values the file does not.
    fn update<F>(&self, edit: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let mut values = self.lock();
        let mut next = values.clone();
        edit(&mut next);
        self.persist(&next)?;
        *values = next;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, values: &Map<String, Value>) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, values)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;
        Ok(())
    }
}
