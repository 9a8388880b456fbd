use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{ObjectStore, StorageError, StoredObject};

const URL_PREFIX: &str = "memory://objects/";

/// Keeps objects in process; used in development and tests
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, (String, Vec<u8>)>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<StoredObject, StorageError> {
        self.objects
            .write()
            .await
            .insert(path.to_string(), (content_type.to_string(), bytes));
        Ok(StoredObject {
            url: format!("{}{}", URL_PREFIX, path),
            path: path.to_string(),
        })
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.objects.write().await.remove(path);
        Ok(())
    }

    fn path_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(URL_PREFIX).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_delete() {
        let store = MemoryObjectStore::new();
        let stored = store.put("a/b.txt", b"hello".to_vec(), "text/plain").await.unwrap();
        assert_eq!(stored.path, "a/b.txt");
        assert_eq!(store.path_from_url(&stored.url).as_deref(), Some("a/b.txt"));
        assert!(store.contains("a/b.txt").await);

        store.delete("a/b.txt").await.unwrap();
        assert_eq!(store.len().await, 0);
    }
}
