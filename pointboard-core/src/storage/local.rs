/// Local filesystem storage backend.
///
/// Stores each key as `<root>/<key>.json` with:
/// - Atomic writes (write to .tmp, fsync, rename, fsync directory)
/// - Writes skipped when the file on disk already holds the same payload
///   (compared by SHA-256 of the current file, never a remembered value)
/// - A write mutex so two writers in one process never interleave on a key

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use sha2::{Digest, Sha256};

use super::{validate_key, StorageBackend, StorageError};

pub struct LocalStorage {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalStorage {
    /// Open (and create if needed) a storage directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        log::debug!("[pointboard.storage] Opened local storage at {:?}", root);
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`.
    pub fn key_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{}.json", key)))
    }

    /// Whether `path` currently holds exactly `payload`.
    fn is_unchanged(path: &Path, payload: &str) -> bool {
        match fs::read(path) {
            Ok(on_disk) => payload_digest(&on_disk) == payload_digest(payload.as_bytes()),
            Err(_) => false,
        }
    }

    /// Atomic write with fsync: write to .tmp, fsync, rename, fsync directory.
    fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
        let tmp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;

        // fsync directory for rename durability
        if let Some(dir) = path.parent() {
            if let Ok(d) = fs::File::open(dir) {
                let _ = d.sync_all();
            }
        }
        Ok(())
    }
}

fn payload_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

impl StorageBackend for LocalStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, payload: &str) -> Result<(), StorageError> {
        let path = self.key_path(key)?;
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if Self::is_unchanged(&path, payload) {
            log::trace!("[pointboard.storage] Skipping unchanged write for {}", key);
            return Ok(());
        }

        Self::atomic_write(&path, payload)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.key_path(key)?;
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();

        storage.write("kanbanState", r#"{"boards":[]}"#).unwrap();
        assert_eq!(
            storage.read("kanbanState").unwrap().as_deref(),
            Some(r#"{"boards":[]}"#)
        );

        let on_disk = fs::read_to_string(dir.path().join("kanbanState.json")).unwrap();
        assert_eq!(on_disk, r#"{"boards":[]}"#);
        assert!(!dir.path().join("kanbanState.json.tmp").exists());
    }

    #[test]
    fn test_read_missing_key() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();
        assert!(storage.read("language").unwrap().is_none());
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = LocalStorage::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(storage.root(), nested.as_path());
    }

    #[test]
    fn test_unchanged_write_restores_deleted_file() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();

        storage.write("language", "\"tr\"").unwrap();
        fs::remove_file(dir.path().join("language.json")).unwrap();

        // Same payload, but the file is gone: it must be written again.
        storage.write("language", "\"tr\"").unwrap();
        assert!(dir.path().join("language.json").exists());
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();

        storage.write("dailyTodos", "[]").unwrap();
        storage.remove("dailyTodos").unwrap();
        assert!(storage.read("dailyTodos").unwrap().is_none());
        // Removing again is fine
        storage.remove("dailyTodos").unwrap();
    }

    #[test]
    fn test_invalid_key_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();
        assert!(matches!(
            storage.write("../escape", "1"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_repeated_write_lands_after_foreign_write() {
        let dir = TempDir::new().unwrap();
        let a = LocalStorage::open(dir.path()).unwrap();
        let b = LocalStorage::open(dir.path()).unwrap();

        a.write("language", "\"en\"").unwrap();
        b.write("language", "\"tr\"").unwrap();
        a.write("language", "\"en\"").unwrap();

        let on_disk = fs::read_to_string(dir.path().join("language.json")).unwrap();
        assert_eq!(on_disk, "\"en\"");
    }

    #[test]
    fn test_identical_write_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();
        let path = dir.path().join("dailyTodos.json");

        storage.write("dailyTodos", "[]").unwrap();
        let before = fs::metadata(&path).unwrap().modified().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        storage.write("dailyTodos", "[]").unwrap();
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), before);
    }
}
