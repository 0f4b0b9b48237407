use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::percentile::percentile;

const MIB: f64 = 1024.0 * 1024.0;

/// Min/max/mean and nearest-rank percentiles over one sample set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationStats {
    pub samples: u64,
    #[serde(with = "crate::serde_duration")]
    pub min: Duration,
    #[serde(with = "crate::serde_duration")]
    pub max: Duration,
    #[serde(with = "crate::serde_duration")]
    pub avg: Duration,
    #[serde(with = "crate::serde_duration")]
    pub p50: Duration,
    #[serde(with = "crate::serde_duration")]
    pub p95: Duration,
    #[serde(with = "crate::serde_duration")]
    pub p99: Duration,
}

impl DurationStats {
    /// Summarizes `samples`, sorting them in place.
    pub fn from_samples(samples: &mut [Duration]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        samples.sort_unstable();
        let total: Duration = samples.iter().sum();
        let n = samples.len() as u32;

        Self {
            samples: samples.len() as u64,
            min: samples.first().copied().unwrap_or_default(),
            max: samples.last().copied().unwrap_or_default(),
            avg: total / n.max(1),
            p50: percentile(samples, 50.0),
            p95: percentile(samples, 95.0),
            p99: percentile(samples, 99.0),
        }
    }
}

/// Immutable summary of one scenario against one backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub operation: String,
    pub driver: String,
    /// Bytes moved by one timed sample.
    pub object_size: u64,
    /// Successful timed samples. Failures are counted in `errors` only.
    pub iterations: u64,
    pub errors: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Sum of all successful latency samples.
    #[serde(with = "crate::serde_duration")]
    pub total_duration: Duration,
    pub latency: DurationStats,
    pub ttfb: DurationStats,
    /// MiB/s when `object_size > 0`, otherwise operations per second.
    pub throughput: f64,
    pub ops_per_sec: f64,
    /// Logical operations per timed sample (bulk scenarios time N objects as one sample).
    #[serde(default = "default_batch")]
    pub batch: u64,
    /// Set when the scenario stopped before reaching its planned duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn default_batch() -> u64 {
    1
}

impl Metrics {
    pub(crate) fn compute(
        operation: &str,
        driver: &str,
        object_size: u64,
        latencies: &mut [Duration],
        ttfbs: &mut [Duration],
        errors: u64,
        last_error: Option<String>,
    ) -> Self {
        let total_duration: Duration = latencies.iter().sum();
        let latency = DurationStats::from_samples(latencies);
        let ttfb = DurationStats::from_samples(ttfbs);

        let mut m = Self {
            operation: operation.to_string(),
            driver: driver.to_string(),
            object_size,
            iterations: latency.samples,
            errors,
            last_error,
            total_duration,
            latency,
            ttfb,
            throughput: 0.0,
            ops_per_sec: 0.0,
            batch: 1,
            note: None,
        };
        m.recompute_rates();
        m
    }

    /// Treats every timed sample as `batch` logical operations.
    #[must_use]
    pub fn with_batch(mut self, batch: u64) -> Self {
        self.batch = batch.max(1);
        self.recompute_rates();
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn error_rate(&self) -> f64 {
        let attempts = self.iterations.saturating_add(self.errors);
        if attempts == 0 {
            return 0.0;
        }
        self.errors as f64 / attempts as f64
    }

    fn recompute_rates(&mut self) {
        let secs = self.total_duration.as_secs_f64();
        if secs <= 0.0 {
            self.ops_per_sec = 0.0;
            self.throughput = 0.0;
            return;
        }

        let ops = self.iterations.saturating_mul(self.batch);
        self.ops_per_sec = ops as f64 / secs;
        self.throughput = if self.object_size > 0 {
            let bytes = (self.object_size as f64) * (self.iterations as f64);
            bytes / MIB / secs
        } else {
            self.ops_per_sec
        };
    }
}
