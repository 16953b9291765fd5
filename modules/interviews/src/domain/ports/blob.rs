use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobError {
    #[error("blob storage unavailable: {message}")]
    Unavailable { message: String },

    #[error("blob too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },
}

/// Stored object as returned by `BlobStore::get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Port for object storage of profile images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `path` and return its public URL.
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, BlobError>;

    async fn get(&self, path: &str) -> Result<Option<Blob>, BlobError>;

    /// Remove every object whose path starts with `prefix`; returns the count.
    async fn remove_prefix(&self, prefix: &str) -> Result<usize, BlobError>;
}
