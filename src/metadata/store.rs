//! Storage backends for the metadata cache
//!
//! Entries are stored as JSON values so that any backend can hold any record type.

use crate::error::{ReminderError, Result};
use crate::metadata::types::CacheEntry;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

pub type StoredEntry = CacheEntry<Value>;

/// Key-value backend behind [`crate::metadata::MetadataCache`]
///
/// Implementations must tolerate concurrent readers. Concurrent writers to the same key
/// may race; the last write wins.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<StoredEntry>;

    fn put(&self, key: &str, entry: StoredEntry) -> Result<()>;

    /// Write a batch of entries as one store operation
    fn put_many(&self, entries: Vec<(String, StoredEntry)>) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;

    /// Remove entries that are no longer fresh, returning how many were dropped
    fn purge_expired(&self, now_ms: i64, ttl_ms: i64) -> Result<usize>;

    /// Write times of every stored entry
    fn write_times(&self) -> Vec<i64>;
}

/// Process-local store
#[derive(Default)]
pub struct InMemoryStore {
    entries: DashMap<String, StoredEntry>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for InMemoryStore {
    fn get(&self, key: &str) -> Option<StoredEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    fn put(&self, key: &str, entry: StoredEntry) -> Result<()> {
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn put_many(&self, entries: Vec<(String, StoredEntry)>) -> Result<()> {
        for (key, entry) in entries {
            self.entries.insert(key, entry);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    fn purge_expired(&self, now_ms: i64, ttl_ms: i64) -> Result<usize> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now_ms, ttl_ms));
        Ok(before.saturating_sub(self.entries.len()))
    }

    fn write_times(&self) -> Vec<i64> {
        self.entries.iter().map(|e| e.value().written_at_ms).collect()
    }
}

/// Store persisted as a single JSON document, so cached roster data survives restarts
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, StoredEntry>>,
    /// File writes since open
    persists: AtomicUsize,
}

impl JsonFileStore {
    /// Open the store at `path`; a missing or unreadable file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries: HashMap<String, StoredEntry> = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Cache file unreadable, starting empty"
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            path = %path.display(),
            entries = entries.len(),
            "Opened file-backed cache store"
        );

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            persists: AtomicUsize::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// How many times the file has been rewritten since open
    pub fn persist_count(&self) -> usize {
        self.persists.load(Ordering::Relaxed)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, StoredEntry>>> {
        self.entries
            .lock()
            .map_err(|_| ReminderError::Cache("cache store lock poisoned".to_string()))
    }

    fn persist(&self, entries: &HashMap<String, StoredEntry>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        self.persists.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl CacheStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<StoredEntry> {
        self.lock().ok()?.get(key).cloned()
    }

    fn put(&self, key: &str, entry: StoredEntry) -> Result<()> {
        let mut entries = self.lock()?;
        entries.insert(key.to_string(), entry);
        self.persist(&entries)
    }

    fn put_many(&self, batch: Vec<(String, StoredEntry)>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut entries = self.lock()?;
        entries.extend(batch);
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.lock()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.lock()?;
        entries.clear();
        self.persist(&entries)
    }

    fn purge_expired(&self, now_ms: i64, ttl_ms: i64) -> Result<usize> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now_ms, ttl_ms));
        let removed = before - entries.len();
        if removed > 0 {
            self.persist(&entries)?;
        }
        Ok(removed)
    }

    fn write_times(&self) -> Vec<i64> {
        self.lock()
            .map(|entries| entries.values().map(|e| e.written_at_ms).collect())
            .unwrap_or_default()
    }
}
