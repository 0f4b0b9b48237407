use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use rand::RngCore as _;

/// Unique object keys: `{prefix}/{run_nanos}/{counter}`.
#[derive(Debug)]
pub struct KeyGen {
    run: i64,
    counter: AtomicU64,
}

impl Default for KeyGen {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyGen {
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        Self {
            run: now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp_micros()),
            counter: AtomicU64::new(0),
        }
    }

    pub fn next(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}/{}/{n}", self.run)
    }

    /// A stable namespace for one scenario's objects.
    pub fn scope(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}/{}-{n}", self.run)
    }
}

/// Random payload of `size` bytes.
pub fn random_payload(size: u64) -> Bytes {
    let mut buf = vec![0u8; usize::try_from(size).unwrap_or(usize::MAX)];
    rand::thread_rng().fill_bytes(&mut buf);
    Bytes::from(buf)
}
