use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::{validate_key, StorageBackend, StorageError};

/// In-memory storage backend.
///
/// Clones share the same map, so a second `PersistentStore` built over a clone
/// sees exactly what a reloaded application would see.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw payload under `key`, bypassing any store cache.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Put a raw payload in place, e.g. to simulate a corrupted entry.
    pub fn insert_raw(&self, key: &str, payload: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), payload.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        Ok(self.raw(key))
    }

    fn write(&self, key: &str, payload: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.insert_raw(key, payload);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
