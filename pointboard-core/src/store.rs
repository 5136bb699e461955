/// Reactive key/value store on top of a [`StorageBackend`].
///
/// - `get` hydrates a key from the backend on first access and caches it.
///   Absent, unparsable or type-mismatched payloads yield the caller's default;
///   the problem is logged and never returned as an error.
/// - `set` serializes, persists and only then notifies subscribers of that key.
/// - Every `set` overwrites the whole value. No batching, no cross-process
///   coordination: the last writer wins.
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::storage::local::LocalStorage;
use crate::storage::memory::MemoryStorage;
use crate::storage::{StorageBackend, StorageError};

/// Callback invoked with the key and the freshly committed value.
pub type Listener = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Handle returned by [`PersistentStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    key: String,
    listener: Listener,
}

pub struct PersistentStore {
    backend: Box<dyn StorageBackend>,
    /// key -> hydrated value (`None` when absent or unreadable)
    cache: Mutex<HashMap<String, Option<Value>>>,
    subscriptions: RwLock<Vec<Subscription>>,
    next_subscription: AtomicU64,
}

impl PersistentStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            cache: Mutex::new(HashMap::new()),
            subscriptions: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Store backed by one JSON file per key under `dir`.
    pub fn open_local(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Ok(Self::new(LocalStorage::open(dir)?))
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    /// Read `key`, falling back to `default` when nothing usable is stored.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.hydrate(key) {
            Ok(value) => Self::decode(key, value, default),
            Err(e) => {
                log::warn!("[pointboard.store] Failed to read {}, using default: {}", key, e);
                default
            }
        }
    }

    fn decode<T: DeserializeOwned>(key: &str, value: Option<Value>, default: T) -> T {
        let Some(value) = value else {
            return default;
        };
        match serde_json::from_value(value) {
            Ok(v) => v,
            Err(e) => {
                log::warn!(
                    "[pointboard.store] Stored value for {} has an unexpected shape, using default: {}",
                    key,
                    e
                );
                default
            }
        }
    }

    /// Serialize and persist `value` under `key`, then notify subscribers.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_value(value)?;
        let payload = serde_json::to_string(&json)?;
        self.backend.write(key, &payload)?;

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), Some(json.clone()));
        log::trace!("[pointboard.store] Committed {} ({} bytes)", key, payload.len());

        self.notify(key, &json);
        Ok(())
    }

    /// Read-modify-write. `f` mutates a copy of the current value; the copy is
    /// written back only when `f` returns `Ok`, so a rejected operation leaves
    /// the stored value untouched. Backend read errors abort before `f` runs.
    pub fn update<T, R, E, F>(&self, key: &str, default: T, f: F) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<StorageError>,
        F: FnOnce(&mut T) -> Result<R, E>,
    {
        // A failed read must not turn into a write of `default`.
        let mut value = Self::decode(key, self.hydrate(key)?, default);
        let out = f(&mut value)?;
        self.set(key, &value)?;
        Ok(out)
    }

    /// Delete `key` from the backend. Subscribers see `null`.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.backend.remove(key)?;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), None);
        self.notify(key, &Value::Null);
        Ok(())
    }

    /// Register `listener` for writes to `key`.
    pub fn subscribe<F>(&self, key: &str, listener: F) -> SubscriptionId
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription {
                id,
                key: key.to_string(),
                listener: Arc::new(listener),
            });
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    /// Cached value for `key`, loading it from the backend on first access.
    /// Unparsable payloads are cached as absent; read failures are not cached,
    /// so the next access retries the backend.
    fn hydrate(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.get(key) {
            return Ok(cached.clone());
        }

        let loaded = match self.backend.read(key)? {
            Some(payload) => match serde_json::from_str::<Value>(&payload) {
                Ok(value) => Some(value),
                Err(e) => {
                    log::warn!(
                        "[pointboard.store] Discarding unparsable payload for {}: {}",
                        key,
                        e
                    );
                    None
                }
            },
            None => None,
        };
        cache.insert(key.to_string(), loaded.clone());
        Ok(loaded)
    }

    fn notify(&self, key: &str, value: &Value) {
        // Collect first so listeners may call back into the store.
        let listeners: Vec<Listener> = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.key == key)
            .map(|s| s.listener.clone())
            .collect();
        for listener in listeners {
            listener(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_get_missing_returns_default() {
        let store = PersistentStore::in_memory();
        assert_eq!(store.get("language", "tr".to_string()), "tr");
    }

    #[test]
    fn test_roundtrip_across_reload() {
        let medium = MemoryStorage::new();
        let store = PersistentStore::new(medium.clone());
        store.set("dailyTodos", &vec![1, 2, 3]).unwrap();

        let reloaded = PersistentStore::new(medium);
        assert_eq!(reloaded.get::<Vec<i32>>("dailyTodos", vec![]), vec![1, 2, 3]);
    }

    #[test]
    fn test_unparsable_payload_falls_back() {
        let medium = MemoryStorage::new();
        medium.insert_raw("kanbanState", "{not json");
        let store = PersistentStore::new(medium);
        assert_eq!(store.get::<Vec<u32>>("kanbanState", vec![7]), vec![7]);
    }

    #[test]
    fn test_type_mismatch_falls_back() {
        let medium = MemoryStorage::new();
        medium.insert_raw("totalPoints", "\"lots\"");
        let store = PersistentStore::new(medium);
        assert_eq!(store.get::<u64>("totalPoints", 0), 0);
    }

    #[test]
    fn test_get_is_cached_after_hydration() {
        let medium = MemoryStorage::new();
        medium.insert_raw("language", "\"en\"");
        let store = PersistentStore::new(medium.clone());
        assert_eq!(store.get("language", String::new()), "en");

        // External writers are not observed once hydrated.
        medium.insert_raw("language", "\"tr\"");
        assert_eq!(store.get("language", String::new()), "en");
    }

    #[test]
    fn test_subscribers_notified_after_commit() {
        let medium = MemoryStorage::new();
        let store = PersistentStore::new(medium.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let seen = calls.clone();
        let probe = medium.clone();
        let id = store.subscribe("language", move |key, value| {
            assert_eq!(key, "language");
            assert_eq!(value, &Value::String("en".to_string()));
            // Already persisted when the listener runs.
            assert_eq!(probe.raw("language").as_deref(), Some("\"en\""));
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.set("language", "en").unwrap();
        store.set("dailyTodos", &Vec::<u8>::new()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set("language", "en").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_can_read_store() {
        let store = Arc::new(PersistentStore::in_memory());
        let inner = store.clone();
        let observed = Arc::new(Mutex::new(None));
        let sink = observed.clone();
        store.subscribe("counter", move |_, _| {
            *sink.lock().unwrap() = Some(inner.get::<u32>("counter", 0));
        });
        store.set("counter", &5u32).unwrap();
        assert_eq!(*observed.lock().unwrap(), Some(5));
    }

    #[test]
    fn test_update_writes_only_on_ok() {
        let store = PersistentStore::in_memory();
        store.set("counter", &1u32).unwrap();

        let r: Result<u32, StorageError> = store.update("counter", 0u32, |v| {
            *v += 1;
            Ok(*v)
        });
        assert_eq!(r.unwrap(), 2);

        let r: Result<(), StorageError> = store.update("counter", 0u32, |v| {
            *v += 100;
            Err(StorageError::InvalidKey("rejected".to_string()))
        });
        assert!(r.is_err());
        assert_eq!(store.get("counter", 0u32), 2);
    }

    #[test]
    fn test_remove_resets_to_default() {
        let store = PersistentStore::in_memory();
        store.set("language", "en").unwrap();
        store.remove("language").unwrap();
        assert_eq!(store.get("language", "tr".to_string()), "tr");
    }

    /// Backend whose reads fail while `failing` is set.
    struct FlakyStorage {
        inner: MemoryStorage,
        failing: Arc<std::sync::atomic::AtomicBool>,
    }

    impl StorageBackend for FlakyStorage {
        fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(std::io::Error::other("disk busy").into());
            }
            self.inner.read(key)
        }

        fn write(&self, key: &str, payload: &str) -> Result<(), StorageError> {
            self.inner.write(key, payload)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_read_error_is_retried_and_never_overwrites() {
        let medium = MemoryStorage::new();
        medium.insert_raw("counter", "41");
        let failing = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let store = PersistentStore::new(FlakyStorage {
            inner: medium.clone(),
            failing: failing.clone(),
        });

        assert_eq!(store.get("counter", 0u32), 0);
        let r: Result<(), StorageError> = store.update("counter", 0u32, |v| {
            *v += 1;
            Ok(())
        });
        assert!(matches!(r, Err(StorageError::Io(_))));
        assert_eq!(medium.raw("counter").as_deref(), Some("41"));

        failing.store(false, Ordering::SeqCst);
        assert_eq!(store.get("counter", 0u32), 41);
        let r: Result<(), StorageError> = store.update("counter", 0u32, |v| {
            *v += 1;
            Ok(())
        });
        r.unwrap();
        assert_eq!(medium.raw("counter").as_deref(), Some("42"));
    }

    #[test]
    fn test_last_writer_wins_across_stores_on_one_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = PersistentStore::open_local(dir.path()).unwrap();
        let b = PersistentStore::open_local(dir.path()).unwrap();

        a.set("language", "en").unwrap();
        b.set("language", "tr").unwrap();
        a.set("language", "en").unwrap();

        let reopened = PersistentStore::open_local(dir.path()).unwrap();
        assert_eq!(reopened.get("language", String::new()), "en");
    }
}
