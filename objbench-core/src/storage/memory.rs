use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use url::Url;

use super::{
    Bucket, BucketInfo, ByteRange, Driver, Error, Multipart, MultipartUpload, ObjectInfo,
    ObjectReader, PartInfo, Result, Storage, paginate, validate_key,
};

/// `memory://`: every open yields an empty, private store.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryDriver;

#[async_trait]
impl Driver for MemoryDriver {
    async fn open(&self, _dsn: &Url) -> Result<Arc<dyn Storage>> {
        Ok(Arc::new(MemoryStorage::new()))
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    content_type: String,
}

#[derive(Debug)]
struct PendingUpload {
    key: String,
    content_type: String,
    parts: BTreeMap<u32, Bytes>,
}

/// Objects and in-flight multipart uploads of one bucket.
#[derive(Debug, Default)]
struct BucketState {
    objects: DashMap<String, StoredObject>,
    uploads: DashMap<String, PendingUpload>,
    next_upload: AtomicU64,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    buckets: Arc<DashMap<String, Arc<BucketState>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self, name: &str) -> Arc<BucketState> {
        self.buckets
            .entry(name.to_string())
            .or_default()
            .value()
            .clone()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn list_buckets(&self, limit: usize) -> Result<Vec<BucketInfo>> {
        let mut names: Vec<String> = self.buckets.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(paginate(names, limit, 0)
            .into_iter()
            .map(|name| BucketInfo { name })
            .collect())
    }

    async fn create_bucket(&self, name: &str) -> Result<()> {
        if self.buckets.contains_key(name) {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        self.buckets.insert(name.to_string(), Arc::default());
        Ok(())
    }

    async fn delete_bucket(&self, name: &str) -> Result<()> {
        self.buckets
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn bucket(&self, name: &str) -> Arc<dyn Bucket> {
        Arc::new(MemoryBucket {
            name: name.to_string(),
            state: self.state(name),
            store: self.clone(),
        })
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub struct MemoryBucket {
    name: String,
    state: Arc<BucketState>,
    store: MemoryStorage,
}

impl MemoryBucket {
    fn info(&self, key: &str, obj: &StoredObject) -> ObjectInfo {
        ObjectInfo {
            bucket: self.name.clone(),
            key: key.to_string(),
            size: obj.body.len() as u64,
            content_type: Some(obj.content_type.clone()),
        }
    }

    fn object(&self, key: &str) -> Result<StoredObject> {
        self.state
            .objects
            .get(key)
            .map(|o| o.value().clone())
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }
}

#[async_trait]
impl Bucket for MemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, key: &str, body: Bytes, content_type: &str) -> Result<ObjectInfo> {
        validate_key(key)?;
        let obj = StoredObject {
            body,
            content_type: content_type.to_string(),
        };
        let info = self.info(key, &obj);
        self.state.objects.insert(key.to_string(), obj);
        Ok(info)
    }

    async fn open(&self, key: &str, range: Option<ByteRange>) -> Result<ObjectReader> {
        let obj = self.object(key)?;
        let body = match range {
            Some(r) => {
                let (start, end) = r.clamp(obj.body.len() as u64);
                obj.body.slice(start as usize..end as usize)
            }
            None => obj.body,
        };
        Ok(Box::new(std::io::Cursor::new(body)))
    }

    async fn stat(&self, key: &str) -> Result<ObjectInfo> {
        let obj = self.object(key)?;
        Ok(self.info(key, &obj))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.state
            .objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    async fn copy(&self, dst_key: &str, src_bucket: &str, src_key: &str) -> Result<ObjectInfo> {
        validate_key(dst_key)?;
        let src = if src_bucket == self.name {
            self.state.clone()
        } else {
            self.store
                .buckets
                .get(src_bucket)
                .map(|b| b.value().clone())
                .ok_or_else(|| Error::NotFound(src_bucket.to_string()))?
        };

        // Clone out before inserting; both keys may live in the same shard.
        let obj = src
            .objects
            .get(src_key)
            .map(|o| o.value().clone())
            .ok_or_else(|| Error::NotFound(src_key.to_string()))?;
        let info = self.info(dst_key, &obj);
        self.state.objects.insert(dst_key.to_string(), obj);
        Ok(info)
    }

    async fn list(&self, prefix: &str, limit: usize, offset: usize) -> Result<Vec<ObjectInfo>> {
        let mut matching: Vec<(String, StoredObject)> = self
            .state
            .objects
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        matching.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(paginate(matching, limit, offset)
            .iter()
            .map(|(k, o)| self.info(k, o))
            .collect())
    }

    fn multipart(&self) -> Option<&dyn Multipart> {
        Some(self)
    }
}

#[async_trait]
impl Multipart for MemoryBucket {
    async fn init(&self, key: &str, content_type: &str) -> Result<MultipartUpload> {
        validate_key(key)?;
        let n = self.state.next_upload.fetch_add(1, Ordering::Relaxed);
        let upload_id = format!("{}-{n}", self.name);
        self.state.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                key: key.to_string(),
                content_type: content_type.to_string(),
                parts: BTreeMap::new(),
            },
        );
        Ok(MultipartUpload {
            key: key.to_string(),
            upload_id,
        })
    }

    async fn upload_part(
        &self,
        upload: &MultipartUpload,
        number: u32,
        body: Bytes,
    ) -> Result<PartInfo> {
        let mut pending = self
            .state
            .uploads
            .get_mut(&upload.upload_id)
            .ok_or_else(|| Error::NotFound(upload.upload_id.clone()))?;
        let size = body.len() as u64;
        pending.parts.insert(number, body);
        Ok(PartInfo {
            number,
            size,
            etag: format!("{}-{number}", upload.upload_id),
        })
    }

    async fn complete(&self, upload: &MultipartUpload, parts: &[PartInfo]) -> Result<ObjectInfo> {
        let (_, pending) = self
            .state
            .uploads
            .remove(&upload.upload_id)
            .ok_or_else(|| Error::NotFound(upload.upload_id.clone()))?;

        let mut numbers: Vec<u32> = parts.iter().map(|p| p.number).collect();
        numbers.sort_unstable();

        let mut body = BytesMut::new();
        for n in numbers {
            let part = pending
                .parts
                .get(&n)
                .ok_or_else(|| Error::Backend(format!("part {n} was never uploaded")))?;
            body.extend_from_slice(part);
        }

        let obj = StoredObject {
            body: body.freeze(),
            content_type: pending.content_type,
        };
        let info = self.info(&pending.key, &obj);
        self.state.objects.insert(pending.key, obj);
        Ok(info)
    }

    async fn abort(&self, upload: &MultipartUpload) -> Result<()> {
        self.state
            .uploads
            .remove(&upload.upload_id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(upload.upload_id.clone()))
    }

    async fn list_parts(&self, upload: &MultipartUpload) -> Result<Vec<PartInfo>> {
        let pending = self
            .state
            .uploads
            .get(&upload.upload_id)
            .ok_or_else(|| Error::NotFound(upload.upload_id.clone()))?;
        Ok(pending
            .parts
            .iter()
            .map(|(n, body)| PartInfo {
                number: *n,
                size: body.len() as u64,
                etag: format!("{}-{n}", upload.upload_id),
            })
            .collect())
    }
}
