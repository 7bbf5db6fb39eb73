//! Object storage collaborators.
//!
//! Objects are addressed by slash-separated keys such as `images/cat.png`.
//! [`FsStorage`] maps keys under a root directory; [`MemoryStorage`] keeps
//! them in a map and is used by tests and dry runs.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::StorageError;

/// Byte-oriented get/put/url store.
pub trait ObjectStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Store `bytes` under `key`, replacing any previous object.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Public URL for `key`. Does not check that the object exists.
    fn url(&self, key: &str) -> String;
}

fn join_url(base_url: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

/// Objects stored as files under a root directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
    base_url: String,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path inside the root. Keys may not climb out of it.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !is_plain {
            return Err(StorageError::InvalidPath(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStorage for FsStorage {
    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::Io {
                path: path.display().to_string(),
                source: e,
            },
        })
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        let io_err = |source| StorageError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        // Write beside the target and rename so readers never see a partial object
        let mut staging = path.clone().into_os_string();
        staging.push(".partial");
        let staging = PathBuf::from(staging);
        fs::write(&staging, bytes).map_err(io_err)?;
        fs::rename(&staging, &path).map_err(io_err)?;

        debug!(key, bytes = bytes.len(), "object stored");
        Ok(())
    }

    fn url(&self, key: &str) -> String {
        join_url(&self.base_url, key)
    }
}

/// Objects kept in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    base_url: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    fn objects(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }
}

impl ObjectStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.objects().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn url(&self, key: &str) -> String {
        join_url(&self.base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://cdn.test/", "/images/a.jpg"),
            "https://cdn.test/images/a.jpg"
        );
        assert_eq!(
            join_url("https://cdn.test", "images/a.jpg"),
            "https://cdn.test/images/a.jpg"
        );
    }

    #[test]
    fn test_fs_put_get() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path(), "https://cdn.test");

        storage.put("images/a.jpg", b"abc").unwrap();
        assert_eq!(storage.get("images/a.jpg").unwrap(), b"abc");
        assert!(dir.path().join("images/a.jpg").exists());
        assert!(!dir.path().join("images/a.jpg.partial").exists());
    }

    #[test]
    fn test_fs_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path(), "https://cdn.test");
        assert!(matches!(
            storage.get("nope.png"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_fs_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path(), "https://cdn.test");
        for key in ["../etc/passwd", "/etc/passwd", "images/../../x", ""] {
            assert!(
                matches!(storage.put(key, b"x"), Err(StorageError::InvalidPath(_))),
                "{}",
                key
            );
        }
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new("https://cdn.test");
        assert!(storage.is_empty());
        storage.put("images/a.png", b"1").unwrap();
        storage.put("images/a.png", b"2").unwrap();
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.get("images/a.png").unwrap(), b"2");
        assert_eq!(storage.url("images/a.png"), "https://cdn.test/images/a.png");
        assert!(matches!(storage.get("x"), Err(StorageError::NotFound(_))));
    }
}
