use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::domain::ports::{Blob, BlobError, BlobStore};

/// Object storage kept in memory. URLs are `{base_url}/{path}`.
pub struct MemoryBlobStore {
    base_url: String,
    objects: DashMap<String, Blob>,
    offline: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: DashMap::new(),
            offline: AtomicBool::new(false),
        }
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// While offline every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    fn ensure_online(&self) -> Result<(), BlobError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BlobError::Unavailable {
                message: "blob storage offline".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BlobError> {
        self.ensure_online()?;
        debug!(path, size = bytes.len(), "storing blob");
        self.objects.insert(
            path.to_string(),
            Blob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(self.url_for(path))
    }

    async fn get(&self, path: &str) -> Result<Option<Blob>, BlobError> {
        self.ensure_online()?;
        Ok(self.objects.get(path).map(|e| e.value().clone()))
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<usize, BlobError> {
        self.ensure_online()?;
        let before = self.objects.len();
        self.objects.retain(|path, _| !path.starts_with(prefix));
        Ok(before - self.objects.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_and_remove_by_prefix() {
        let blobs = MemoryBlobStore::new("http://localhost/files/");
        let url = blobs
            .put("avatars/u1-1.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        assert_eq!(url, "http://localhost/files/avatars/u1-1.png");
        blobs.put("avatars/u10-1.png", vec![4], "image/png").await.unwrap();
        blobs.put("covers/u1-2.jpg", vec![5], "image/jpeg").await.unwrap();

        let blob = blobs.get("avatars/u1-1.png").await.unwrap().unwrap();
        assert_eq!(blob.content_type, "image/png");

        assert_eq!(blobs.remove_prefix("avatars/u1-").await.unwrap(), 1);
        assert_eq!(blobs.paths(), vec!["avatars/u10-1.png", "covers/u1-2.jpg"]);
    }

    #[tokio::test]
    async fn offline_store_fails() {
        let blobs = MemoryBlobStore::new("http://localhost/files");
        blobs.set_offline(true);
        assert!(blobs.remove_prefix("avatars/").await.is_err());
    }
}
