use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use super::{
    Bucket, BucketInfo, ByteRange, Driver, ObjectInfo, ObjectReader, Result, Storage,
};

/// `devnull://`: accepts every write and stores nothing.
///
/// Useful as a floor for harness overhead. Reads are empty, listings are empty,
/// and there is no multipart capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct DevNullDriver;

#[async_trait]
impl Driver for DevNullDriver {
    async fn open(&self, _dsn: &Url) -> Result<Arc<dyn Storage>> {
        Ok(Arc::new(DevNullStorage))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DevNullStorage;

#[async_trait]
impl Storage for DevNullStorage {
    async fn list_buckets(&self, _limit: usize) -> Result<Vec<BucketInfo>> {
        Ok(Vec::new())
    }

    async fn create_bucket(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn delete_bucket(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn bucket(&self, name: &str) -> Arc<dyn Bucket> {
        Arc::new(DevNullBucket {
            name: name.to_string(),
        })
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct DevNullBucket {
    name: String,
}

impl DevNullBucket {
    fn info(&self, key: &str, size: u64) -> ObjectInfo {
        ObjectInfo {
            bucket: self.name.clone(),
            key: key.to_string(),
            size,
            content_type: None,
        }
    }
}

#[async_trait]
impl Bucket for DevNullBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, key: &str, body: Bytes, _content_type: &str) -> Result<ObjectInfo> {
        Ok(self.info(key, body.len() as u64))
    }

    async fn open(&self, _key: &str, _range: Option<ByteRange>) -> Result<ObjectReader> {
        Ok(Box::new(tokio::io::empty()))
    }

    async fn stat(&self, key: &str) -> Result<ObjectInfo> {
        Ok(self.info(key, 0))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn copy(&self, dst_key: &str, _src_bucket: &str, _src_key: &str) -> Result<ObjectInfo> {
        Ok(self.info(dst_key, 0))
    }

    async fn list(&self, _prefix: &str, _limit: usize, _offset: usize) -> Result<Vec<ObjectInfo>> {
        Ok(Vec::new())
    }
}
