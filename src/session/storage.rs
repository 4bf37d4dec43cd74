// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-local key/value storage for the session slot.
//!
//! Reads are synchronous so the session can be known before anything is
//! rendered. [`MemoryStorage`] clones share one origin and broadcast every
//! mutation, which is how a change in one context reaches the others.

use dashmap::DashMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::error::AuthError;

const EVENT_CAPACITY: usize = 64;

/// Synchronous string key/value store.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AuthError>;
    fn remove(&self, key: &str) -> Result<(), AuthError>;
    /// Remove every key.
    fn clear(&self) -> Result<(), AuthError>;
}

/// A storage mutation. `key` is `None` when the whole store was cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: Option<String>,
    pub new_value: Option<String>,
}

impl StorageEvent {
    /// Whether this event can have changed `key`.
    pub fn touches(&self, key: &str) -> bool {
        self.key.as_deref().map_or(true, |k| k == key)
    }
}

/// In-memory storage shared by every clone.
#[derive(Clone)]
pub struct MemoryStorage {
    entries: Arc<DashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: Arc::new(DashMap::new()),
            events,
        }
    }

    /// Receive every mutation made through any clone.
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }

    /// Sender for injecting events, e.g. from another process.
    pub fn event_sender(&self) -> broadcast::Sender<StorageEvent> {
        self.events.clone()
    }

    fn emit(&self, key: Option<&str>, new_value: Option<&str>) {
        // No receivers is fine.
        let _ = self.events.send(StorageEvent {
            key: key.map(str::to_string),
            new_value: new_value.map(str::to_string),
        });
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.emit(Some(key), Some(value));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        if self.entries.remove(key).is_some() {
            self.emit(Some(key), None);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        self.entries.clear();
        self.emit(None, None);
        Ok(())
    }
}

/// Storage persisted as one JSON object in a file.
///
/// Writes go to a sibling temp file and are renamed into place.
/// There is no cross-process change notification.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&self) -> Result<Option<String>, AuthError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(None),
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AuthError::Storage(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn load(&self) -> Result<HashMap<String, String>, AuthError> {
        let Some(raw) = self.read_raw()? else {
            return Ok(HashMap::new());
        };

        serde_json::from_str(&raw).map_err(|e| {
            AuthError::Storage(format!("Corrupt storage file {}: {}", self.path.display(), e))
        })
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<(), AuthError> {
        let json = serde_json::to_string(entries)
            .map_err(|e| AuthError::Storage(format!("Failed to serialize storage: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                AuthError::Storage(format!("Failed to write {}: {}", self.path.display(), e))
            })
    }

    fn update<F>(&self, mutate: F) -> Result<(), AuthError>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| AuthError::Storage("Storage lock poisoned".to_string()))?;
        let mut entries = match self.read_raw()? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Corrupt storage file, overwriting"
                );
                HashMap::new()
            }),
            None => HashMap::new(),
        };
        mutate(&mut entries);
        self.save(&entries)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> Result<(), AuthError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| AuthError::Storage("Storage lock poisoned".to_string()))?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Storage(format!(
                "Failed to clear {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
