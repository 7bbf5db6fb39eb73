//! Image metadata records and the ownership lookup.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// A stored image and the user that uploaded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: u64,
    pub user_id: u64,
    /// Storage key of the original object.
    pub path: String,
}

impl ImageRecord {
    pub fn is_owned_by(&self, user_id: u64) -> bool {
        self.user_id == user_id
    }
}

/// Lookup and registration of image records.
pub trait ImageRepository: Send + Sync {
    fn find(&self, id: u64) -> Option<ImageRecord>;

    /// Register a new record and return it with its assigned id.
    fn insert(&self, user_id: u64, path: &str) -> ImageRecord;
}

#[derive(Debug, Default)]
struct Records {
    next_id: u64,
    by_id: HashMap<u64, ImageRecord>,
}

/// Records held in process memory. Ids start at 1.
#[derive(Debug, Default)]
pub struct InMemoryImageRepository {
    inner: Mutex<Records>,
}

impl InMemoryImageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImageRepository for InMemoryImageRepository {
    fn find(&self, id: u64) -> Option<ImageRecord> {
        let records = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        records.by_id.get(&id).cloned()
    }

    fn insert(&self, user_id: u64, path: &str) -> ImageRecord {
        let mut records = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        records.next_id += 1;
        let record = ImageRecord {
            id: records.next_id,
            user_id,
            path: path.to_string(),
        };
        records.by_id.insert(record.id, record.clone());
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let repo = InMemoryImageRepository::new();
        let a = repo.insert(10, "images/a.png");
        let b = repo.insert(11, "images/b.png");
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(repo.find(2), Some(b));
    }

    #[test]
    fn test_find_unknown() {
        let repo = InMemoryImageRepository::new();
        assert_eq!(repo.find(1), None);
    }

    #[test]
    fn test_ownership() {
        let record = ImageRecord {
            id: 1,
            user_id: 5,
            path: "images/a.png".to_string(),
        };
        assert!(record.is_owned_by(5));
        assert!(!record.is_owned_by(6));
    }
}
