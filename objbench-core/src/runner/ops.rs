//! Per-scenario operation strategies.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::execute::{ScenarioOp, with_timeout};
use super::scenario::EdgeCase;
use crate::keys::{KeyGen, random_payload};
use crate::size::KB;
use crate::storage::{self, Bucket, ByteRange, ObjectReader, PartInfo};
use crate::ttfb::TtfbReader;

pub(crate) const CONTENT_TYPE: &str = "application/octet-stream";

pub(crate) const READ_POOL: usize = 100;
pub(crate) const PARALLEL_READ_POOL: usize = 50;
pub(crate) const MIXED_POOL: usize = 50;

/// Shared handles every operation needs.
#[derive(Clone)]
pub(crate) struct Target {
    pub bucket: Arc<dyn Bucket>,
    pub keys: Arc<KeyGen>,
    /// Applied to untimed fixture writes as well.
    pub timeout: Option<Duration>,
}

impl Target {
    async fn put(&self, key: &str, body: Bytes) -> storage::Result<()> {
        with_timeout(self.timeout, self.bucket.write(key, body, CONTENT_TYPE)).await?;
        Ok(())
    }

    async fn put_all(&self, keys: &[String], body: &Bytes) -> storage::Result<()> {
        for key in keys {
            self.put(key, body.clone()).await?;
        }
        Ok(())
    }
}

/// Reads a body to the end and reports when its first byte arrived.
async fn drain(reader: ObjectReader, started: Instant) -> storage::Result<Duration> {
    let mut reader = TtfbReader::new(reader, started);
    tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok(reader.ttfb())
}

pub(crate) struct WriteOp {
    target: Target,
    prefix: String,
    payload: Bytes,
}

impl WriteOp {
    pub(crate) fn new(target: Target, prefix: &str, size: u64) -> Self {
        Self {
            target,
            prefix: prefix.to_string(),
            payload: random_payload(size),
        }
    }
}

#[async_trait]
impl ScenarioOp for WriteOp {
    async fn execute(&self, _seq: u64, _started: Instant) -> storage::Result<Option<Duration>> {
        let key = self.target.keys.next(&self.prefix);
        self.target
            .bucket
            .write(&key, self.payload.clone(), CONTENT_TYPE)
            .await?;
        Ok(None)
    }
}

/// Reads round-robin from a pool of pre-written objects.
pub(crate) struct ReadOp {
    target: Target,
    pool: Vec<String>,
    payload: Bytes,
}

impl ReadOp {
    pub(crate) fn new(target: Target, prefix: &str, size: u64, pool: usize) -> Self {
        let scope = target.keys.scope(prefix);
        let pool = (0..pool.max(1)).map(|i| format!("{scope}/{i}")).collect();
        Self {
            target,
            pool,
            payload: random_payload(size),
        }
    }
}

#[async_trait]
impl ScenarioOp for ReadOp {
    async fn prepare(&self) -> storage::Result<()> {
        self.target.put_all(&self.pool, &self.payload).await
    }

    async fn execute(&self, seq: u64, started: Instant) -> storage::Result<Option<Duration>> {
        let key = pick(&self.pool, seq);
        let reader = self.target.bucket.open(key, None).await?;
        Ok(Some(drain(reader, started).await?))
    }
}

fn pick(pool: &[String], seq: u64) -> &str {
    let len = pool.len().max(1) as u64;
    usize::try_from(seq % len)
        .ok()
        .and_then(|i| pool.get(i))
        .map_or("", String::as_str)
}

pub(crate) struct StatOp {
    target: Target,
    key: String,
}

impl StatOp {
    pub(crate) fn new(target: Target, prefix: &str) -> Self {
        let key = target.keys.next(prefix);
        Self { target, key }
    }
}

#[async_trait]
impl ScenarioOp for StatOp {
    async fn prepare(&self) -> storage::Result<()> {
        self.target.put(&self.key, random_payload(KB)).await
    }

    async fn execute(&self, _seq: u64, _started: Instant) -> storage::Result<Option<Duration>> {
        self.target.bucket.stat(&self.key).await?;
        Ok(None)
    }
}

pub(crate) struct ListOp {
    target: Target,
    scope: String,
    objects: usize,
}

impl ListOp {
    pub(crate) fn new(target: Target, prefix: &str, objects: usize) -> Self {
        let scope = target.keys.scope(prefix);
        Self {
            target,
            scope,
            objects,
        }
    }
}

#[async_trait]
impl ScenarioOp for ListOp {
    async fn prepare(&self) -> storage::Result<()> {
        let body = random_payload(KB);
        for i in 0..self.objects {
            self.target
                .put(&format!("{}/{i:05}", self.scope), body.clone())
                .await?;
        }
        Ok(())
    }

    async fn execute(&self, _seq: u64, _started: Instant) -> storage::Result<Option<Duration>> {
        self.target
            .bucket
            .list(&format!("{}/", self.scope), self.objects, 0)
            .await?;
        Ok(None)
    }
}

/// Each round deletes objects written just before it, outside the timed section.
pub(crate) struct DeleteOp {
    target: Target,
    prefix: String,
    payload: Bytes,
    staged: Mutex<Vec<String>>,
}

impl DeleteOp {
    pub(crate) fn new(target: Target, prefix: &str) -> Self {
        Self {
            target,
            prefix: prefix.to_string(),
            payload: random_payload(KB),
            staged: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ScenarioOp for DeleteOp {
    /// A failed staging write leaves one slot empty; the matching delete is then an error sample.
    async fn prepare_round(&self, n: u64) -> storage::Result<()> {
        for _ in 0..n {
            let key = self.target.keys.next(&self.prefix);
            match self.target.put(&key, self.payload.clone()).await {
                Ok(()) => self.staged.lock().push(key),
                Err(err) => debug!(key = %key, "staging write failed: {err}"),
            }
        }
        Ok(())
    }

    async fn execute(&self, _seq: u64, _started: Instant) -> storage::Result<Option<Duration>> {
        let key = self
            .staged
            .lock()
            .pop()
            .ok_or_else(|| storage::Error::Backend("no staged object to delete".into()))?;
        self.target.bucket.delete(&key).await?;
        Ok(None)
    }
}

pub(crate) struct RangeReadOp {
    target: Target,
    key: String,
    object_size: u64,
    range: ByteRange,
}

impl RangeReadOp {
    pub(crate) fn new(target: Target, prefix: &str, object_size: u64, range: ByteRange) -> Self {
        let key = target.keys.next(prefix);
        Self {
            target,
            key,
            object_size,
            range,
        }
    }
}

#[async_trait]
impl ScenarioOp for RangeReadOp {
    async fn prepare(&self) -> storage::Result<()> {
        self.target
            .put(&self.key, random_payload(self.object_size))
            .await
    }

    async fn execute(&self, _seq: u64, started: Instant) -> storage::Result<Option<Duration>> {
        let reader = self.target.bucket.open(&self.key, Some(self.range)).await?;
        Ok(Some(drain(reader, started).await?))
    }
}

pub(crate) struct CopyOp {
    target: Target,
    prefix: String,
    source: String,
    size: u64,
}

impl CopyOp {
    pub(crate) fn new(target: Target, prefix: &str, size: u64) -> Self {
        let source = target.keys.next(&format!("{prefix}/src"));
        Self {
            target,
            prefix: format!("{prefix}/dst"),
            source,
            size,
        }
    }
}

#[async_trait]
impl ScenarioOp for CopyOp {
    async fn prepare(&self) -> storage::Result<()> {
        self.target.put(&self.source, random_payload(self.size)).await
    }

    async fn execute(&self, _seq: u64, _started: Instant) -> storage::Result<Option<Duration>> {
        let dst = self.target.keys.next(&self.prefix);
        let bucket = self.target.bucket.name().to_string();
        self.target.bucket.copy(&dst, &bucket, &self.source).await?;
        Ok(None)
    }
}

/// Interleaves reads of a fixed pool with fresh writes at a fixed read share.
pub(crate) struct MixedOp {
    reads: ReadOp,
    writes: WriteOp,
    read_percent: u64,
    counter: AtomicU64,
}

impl MixedOp {
    pub(crate) fn new(target: Target, prefix: &str, size: u64, read_percent: u64) -> Self {
        Self {
            reads: ReadOp::new(target.clone(), &format!("{prefix}/pool"), size, MIXED_POOL),
            writes: WriteOp::new(target, &format!("{prefix}/new"), size),
            read_percent: read_percent.min(100),
            counter: AtomicU64::new(0),
        }
    }

    fn is_read(&self, n: u64) -> bool {
        n % 100 < self.read_percent
    }
}

#[async_trait]
impl ScenarioOp for MixedOp {
    async fn prepare(&self) -> storage::Result<()> {
        self.reads.prepare().await
    }

    async fn execute(&self, _seq: u64, started: Instant) -> storage::Result<Option<Duration>> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        if self.is_read(n) {
            self.reads.execute(n, started).await
        } else {
            self.writes.execute(n, started).await
        }
    }
}

/// init, parts in order, complete. A failed part aborts the upload.
pub(crate) struct MultipartOp {
    target: Target,
    prefix: String,
    part: Bytes,
    parts: u32,
}

impl MultipartOp {
    pub(crate) fn new(target: Target, prefix: &str, part_size: u64, parts: u32) -> Self {
        Self {
            target,
            prefix: prefix.to_string(),
            part: random_payload(part_size),
            parts: parts.max(1),
        }
    }
}

#[async_trait]
impl ScenarioOp for MultipartOp {
    async fn execute(&self, _seq: u64, _started: Instant) -> storage::Result<Option<Duration>> {
        let mp = self
            .target
            .bucket
            .multipart()
            .ok_or(storage::Error::Unsupported("multipart upload"))?;

        let key = self.target.keys.next(&self.prefix);
        let upload = mp.init(&key, CONTENT_TYPE).await?;

        let mut parts: Vec<PartInfo> = Vec::with_capacity(self.parts as usize);
        for number in 1..=self.parts {
            match mp.upload_part(&upload, number, self.part.clone()).await {
                Ok(part) => parts.push(part),
                Err(err) => {
                    if let Err(abort_err) = mp.abort(&upload).await {
                        tracing::debug!(key = %key, error = %abort_err, "multipart abort failed");
                    }
                    return Err(err);
                }
            }
        }

        mp.complete(&upload, &parts).await?;
        Ok(None)
    }
}

pub(crate) struct EdgeCaseOp {
    target: Target,
    prefix: String,
    payload: Bytes,
    case: EdgeCase,
}

impl EdgeCaseOp {
    pub(crate) fn new(target: Target, prefix: &str, case: EdgeCase) -> Self {
        Self {
            target,
            prefix: prefix.to_string(),
            payload: random_payload(case.object_size()),
            case,
        }
    }

    fn key(&self, seq: u64) -> String {
        match self.case {
            EdgeCase::EmptyObject => self.target.keys.next(&self.prefix),
            EdgeCase::LongKey256 => format!("{}/{}/{seq}", self.prefix, "a".repeat(200)),
            EdgeCase::DeepNested => {
                let path: Vec<String> = ('a'..='p').map(String::from).collect();
                format!("{}/{}/{seq}", self.prefix, path.join("/"))
            }
        }
    }
}

#[async_trait]
impl ScenarioOp for EdgeCaseOp {
    async fn execute(&self, seq: u64, _started: Instant) -> storage::Result<Option<Duration>> {
        let key = self.key(seq);
        self.target
            .bucket
            .write(&key, self.payload.clone(), CONTENT_TYPE)
            .await?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, Storage};

    fn target() -> (MemoryStorage, Target) {
        let store = MemoryStorage::new();
        let t = Target {
            bucket: store.bucket("bench"),
            keys: Arc::new(KeyGen::new()),
            timeout: None,
        };
        (store, t)
    }

    #[tokio::test]
    async fn read_op_prepares_pool_and_reports_ttfb() {
        let (_store, t) = target();
        let op = ReadOp::new(t.clone(), "bench/read", 2 * KB, 4);
        assert!(op.prepare().await.is_ok());

        let listed = t.bucket.list("bench/read", 0, 0).await.unwrap_or_default();
        assert_eq!(listed.len(), 4);

        let ttfb = op.execute(7, Instant::now()).await.ok().flatten();
        assert!(ttfb.is_some());
    }

    #[tokio::test]
    async fn delete_op_consumes_staged_objects() {
        let (_store, t) = target();
        let op = DeleteOp::new(t.clone(), "bench/delete");
        assert!(op.prepare_round(3).await.is_ok());
        assert_eq!(t.bucket.list("bench/delete", 0, 0).await.map(|v| v.len()).ok(), Some(3));

        for _ in 0..3 {
            assert!(op.execute(0, Instant::now()).await.is_ok());
        }
        assert!(op.execute(0, Instant::now()).await.is_err());
        assert_eq!(t.bucket.list("bench/delete", 0, 0).await.map(|v| v.len()).ok(), Some(0));
    }

    #[test]
    fn mixed_read_share_is_exact_per_hundred() {
        let (_store, t) = target();
        let op = MixedOp::new(t, "bench/mixed", KB, 90);
        let reads = (0..100).filter(|n| op.is_read(*n)).count();
        assert_eq!(reads, 90);

        let (_store, t) = target();
        let op = MixedOp::new(t, "bench/mixed", KB, 10);
        let reads = (0..1000).filter(|n| op.is_read(*n)).count();
        assert_eq!(reads, 100);
    }

    #[tokio::test]
    async fn multipart_op_completes_upload() {
        let (_store, t) = target();
        let op = MultipartOp::new(t.clone(), "bench/multipart", KB, 3);
        assert!(op.execute(0, Instant::now()).await.is_ok());

        let objects = t.bucket.list("bench/multipart", 0, 0).await.unwrap_or_default();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].size, 3 * KB);
    }

    #[test]
    fn edge_case_keys_have_expected_shape() {
        let (_store, t) = target();
        let long = EdgeCaseOp::new(t.clone(), "bench/edge", EdgeCase::LongKey256);
        assert!(long.key(3).len() > 200);

        let deep = EdgeCaseOp::new(t, "bench/edge", EdgeCase::DeepNested);
        assert_eq!(deep.key(0).matches('/').count(), 18);
    }

    #[tokio::test]
    async fn range_read_returns_requested_slice() {
        let (_store, t) = target();
        let op = RangeReadOp::new(t, "bench/range", 4 * KB, ByteRange::new(KB, KB));
        assert!(op.prepare().await.is_ok());
        assert!(op.execute(0, Instant::now()).await.is_ok());
    }
}
