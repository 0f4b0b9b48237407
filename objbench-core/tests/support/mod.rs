#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use objbench_core::storage::{
    self, Bucket, BucketInfo, ByteRange, Driver, MemoryStorage, ObjectInfo, ObjectReader,
    Registry, Storage,
};
use objbench_core::{BenchConfig, DriverConfig, KB};
use url::Url;

/// Writes take `latency`; every `fail_every`-th write (1-based) fails.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    pub latency: Duration,
    pub fail_every: Option<u64>,
    pub writes: Arc<AtomicU64>,
    /// Object listings never return.
    pub hang_list: bool,
    pub fail_create: bool,
    pub closes: Arc<AtomicU64>,
}

impl FakeBackend {
    pub fn fixed(latency: Duration) -> Self {
        Self {
            latency,
            fail_every: None,
            writes: Arc::new(AtomicU64::new(0)),
            hang_list: false,
            fail_create: false,
            closes: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn alternating(latency: Duration) -> Self {
        Self {
            fail_every: Some(2),
            ..Self::fixed(latency)
        }
    }
}

#[async_trait]
impl Driver for FakeBackend {
    async fn open(&self, _dsn: &Url) -> storage::Result<Arc<dyn Storage>> {
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl Storage for FakeBackend {
    async fn list_buckets(&self, _limit: usize) -> storage::Result<Vec<BucketInfo>> {
        Ok(Vec::new())
    }

    async fn create_bucket(&self, name: &str) -> storage::Result<()> {
        if self.fail_create {
            return Err(storage::Error::Backend(format!("bucket `{name}` rejected")));
        }
        Ok(())
    }

    async fn delete_bucket(&self, _name: &str) -> storage::Result<()> {
        Ok(())
    }

    fn bucket(&self, name: &str) -> Arc<dyn Bucket> {
        Arc::new(FakeBucket {
            name: name.to_string(),
            backend: self.clone(),
        })
    }

    async fn close(&self) -> storage::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeBucket {
    name: String,
    backend: FakeBackend,
}

impl FakeBucket {
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
impl Bucket for FakeBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, key: &str, body: Bytes, _content_type: &str) -> storage::Result<ObjectInfo> {
        let n = self.backend.writes.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.backend.latency).await;
        if self.backend.fail_every.is_some_and(|every| n % every == 0) {
            return Err(storage::Error::Backend(format!("injected failure on write {n}")));
        }
        Ok(self.info(key, body.len() as u64))
    }

    async fn open(&self, _key: &str, _range: Option<ByteRange>) -> storage::Result<ObjectReader> {
        Ok(Box::new(tokio::io::empty()))
    }

    async fn stat(&self, key: &str) -> storage::Result<ObjectInfo> {
        Ok(self.info(key, 0))
    }

    async fn delete(&self, _key: &str) -> storage::Result<()> {
        Ok(())
    }

    async fn copy(&self, dst_key: &str, _src_bucket: &str, _src_key: &str) -> storage::Result<ObjectInfo> {
        Ok(self.info(dst_key, 0))
    }

    async fn list(&self, _prefix: &str, _limit: usize, _offset: usize) -> storage::Result<Vec<ObjectInfo>> {
        if self.backend.hang_list {
            std::future::pending::<()>().await;
        }
        Ok(Vec::new())
    }
}

/// Always hands out the same in-memory store, so tests can inspect it afterwards.
#[derive(Debug, Clone, Default)]
pub struct SharedMemory(pub MemoryStorage);

#[async_trait]
impl Driver for SharedMemory {
    async fn open(&self, _dsn: &Url) -> storage::Result<Arc<dyn Storage>> {
        Ok(Arc::new(self.0.clone()))
    }
}

/// Never finishes opening.
#[derive(Debug, Clone, Copy)]
pub struct Unreachable;

#[async_trait]
impl Driver for Unreachable {
    async fn open(&self, _dsn: &Url) -> storage::Result<Arc<dyn Storage>> {
        std::future::pending().await
    }
}

pub fn registry_with(scheme: &str, driver: Arc<dyn Driver>) -> Registry {
    let mut r = Registry::with_defaults();
    r.register(scheme, driver);
    r
}

/// One 1KB size, no parallel levels, no file counts, no warm-up.
pub fn tiny_config(drivers: Vec<DriverConfig>, filter: &str) -> BenchConfig {
    BenchConfig {
        bench_time: Duration::from_millis(50),
        min_bench_iterations: 3,
        max_bench_iterations: 50,
        warmup_iterations: 0,
        concurrency: 2,
        concurrency_levels: Vec::new(),
        object_sizes: vec![KB],
        file_counts: Vec::new(),
        multipart_part_size: KB,
        multipart_parts: 3,
        filter: Some(filter.to_string()),
        drivers,
        ..BenchConfig::default()
    }
}
