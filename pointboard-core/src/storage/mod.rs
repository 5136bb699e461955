pub mod local;
pub mod memory;

/// Raw key/value medium underneath [`crate::store::PersistentStore`].
/// Implementations: LocalStorage (one file per key), MemoryStorage (tests, embedding).
///
/// Payloads are opaque strings; the store owns (de)serialization.
pub trait StorageBackend: Send + Sync {
    /// Read the payload stored under `key`. `Ok(None)` when nothing is stored.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the payload under `key`. Must be durable when it returns.
    fn write(&self, key: &str, payload: &str) -> Result<(), StorageError>;

    /// Drop `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Keys become file names, so they are limited to a portable character set.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
