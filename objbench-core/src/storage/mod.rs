//! Narrow storage surface the benchmarks drive, plus the baseline drivers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncRead;

mod devnull;
mod local;
mod memory;
mod registry;

pub use devnull::DevNullDriver;
pub use local::LocalDriver;
pub use memory::{MemoryDriver, MemoryStorage};
pub use registry::{Driver, Registry};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid dsn `{0}`")]
    InvalidDsn(String),

    #[error("no driver registered for scheme `{0}`")]
    UnknownScheme(String),

    #[error("invalid key `{0}`")]
    InvalidKey(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Backend(String),
}

/// Streamed object body.
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

impl ByteRange {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Clamps the range to an object of `size` bytes, as `start..end`.
    pub fn clamp(&self, size: u64) -> (u64, u64) {
        let start = self.offset.min(size);
        let end = self.offset.saturating_add(self.length).min(size);
        (start, end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketInfo {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartUpload {
    pub key: String,
    pub upload_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartInfo {
    pub number: u32,
    pub size: u64,
    pub etag: String,
}

/// An opened connection to a backend.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn list_buckets(&self, limit: usize) -> Result<Vec<BucketInfo>>;
    async fn create_bucket(&self, name: &str) -> Result<()>;
    async fn delete_bucket(&self, name: &str) -> Result<()>;
    fn bucket(&self, name: &str) -> Arc<dyn Bucket>;
    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait Bucket: Send + Sync {
    fn name(&self) -> &str;

    async fn write(&self, key: &str, body: Bytes, content_type: &str) -> Result<ObjectInfo>;
    async fn open(&self, key: &str, range: Option<ByteRange>) -> Result<ObjectReader>;
    async fn stat(&self, key: &str) -> Result<ObjectInfo>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn copy(&self, dst_key: &str, src_bucket: &str, src_key: &str) -> Result<ObjectInfo>;
    /// Keys under `prefix` in lexical order. A `limit` of zero means no limit.
    async fn list(&self, prefix: &str, limit: usize, offset: usize) -> Result<Vec<ObjectInfo>>;

    /// Multipart capability, when the backend has one.
    fn multipart(&self) -> Option<&dyn Multipart> {
        None
    }
}

#[async_trait]
pub trait Multipart: Send + Sync {
    async fn init(&self, key: &str, content_type: &str) -> Result<MultipartUpload>;
    async fn upload_part(
        &self,
        upload: &MultipartUpload,
        number: u32,
        body: Bytes,
    ) -> Result<PartInfo>;
    async fn complete(&self, upload: &MultipartUpload, parts: &[PartInfo]) -> Result<ObjectInfo>;
    async fn abort(&self, upload: &MultipartUpload) -> Result<()>;
    async fn list_parts(&self, upload: &MultipartUpload) -> Result<Vec<PartInfo>>;
}

/// Rejects keys that could escape a bucket or are empty.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty()
        || key.starts_with('/')
        || key.split('/').any(|seg| seg == ".." || seg == ".")
    {
        return Err(Error::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Applies `offset`/`limit` to a sorted listing.
pub(crate) fn paginate<T>(items: Vec<T>, limit: usize, offset: usize) -> Vec<T> {
    let iter = items.into_iter().skip(offset);
    if limit == 0 {
        iter.collect()
    } else {
        iter.take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_clamps_to_object() {
        assert_eq!(ByteRange::new(0, 10).clamp(100), (0, 10));
        assert_eq!(ByteRange::new(90, 20).clamp(100), (90, 100));
        assert_eq!(ByteRange::new(150, 20).clamp(100), (100, 100));
        assert_eq!(ByteRange::new(5, u64::MAX).clamp(100), (5, 100));
    }

    #[test]
    fn key_validation() {
        assert!(validate_key("a/b/c").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/abs").is_err());
        assert!(validate_key("a/../b").is_err());
    }

    #[test]
    fn paginate_skips_and_limits() {
        let v: Vec<u32> = (0..10).collect();
        assert_eq!(paginate(v.clone(), 3, 2), vec![2, 3, 4]);
        assert_eq!(paginate(v.clone(), 0, 8), vec![8, 9]);
        assert!(paginate(v, 5, 20).is_empty());
    }
}
