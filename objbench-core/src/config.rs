use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::size::{KB, MB};

pub const DEFAULT_BUCKET: &str = "objbench";

/// One backend under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    pub name: String,
    pub dsn: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Highest concurrency level the backend is meant to be driven at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

impl DriverConfig {
    pub fn new(name: impl Into<String>, dsn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dsn: dsn.into(),
            bucket: default_bucket(),
            max_concurrency: None,
        }
    }

    /// Parses `NAME=DSN`. A bare DSN is named after its scheme.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let (name, dsn) = match spec.split_once('=') {
            Some((name, dsn)) if !name.contains("://") => (name.trim(), dsn.trim()),
            _ => (spec.split("://").next().unwrap_or_default(), spec),
        };
        if name.is_empty() || dsn.is_empty() || !dsn.contains("://") {
            return Err(Error::InvalidDriver(spec.to_string()));
        }
        Ok(Self::new(name, dsn))
    }

    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max);
        self
    }

    pub fn supports_concurrency(&self, level: usize) -> bool {
        self.max_concurrency.is_none_or(|max| level <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Target measured time per scenario.
    #[serde(with = "crate::serde_util::humantime_duration")]
    pub bench_time: Duration,
    pub min_bench_iterations: u64,
    pub max_bench_iterations: u64,
    pub warmup_iterations: u64,

    /// Worker count for mixed workloads.
    pub concurrency: usize,
    /// Levels for the parallel write/read scenarios.
    pub concurrency_levels: Vec<usize>,
    pub object_sizes: Vec<u64>,

    /// Per-operation timeout. Zero disables it.
    #[serde(with = "crate::serde_util::humantime_duration")]
    pub timeout: Duration,
    /// Overall timeout for one parallel scenario. Falls back to `timeout`.
    #[serde(
        with = "crate::serde_util::humantime_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub parallel_timeout: Option<Duration>,
    #[serde(with = "crate::serde_util::humantime_duration")]
    pub detect_timeout: Duration,

    pub file_counts: Vec<u64>,
    pub multipart_part_size: u64,
    pub multipart_parts: u32,

    /// Substring filter on scenario labels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Delete every object in the bucket after a backend finishes.
    pub cleanup: bool,

    pub drivers: Vec<DriverConfig>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            bench_time: Duration::from_secs(1),
            min_bench_iterations: 3,
            max_bench_iterations: 1_000_000,
            warmup_iterations: 5,
            concurrency: 10,
            concurrency_levels: vec![1, 10, 25],
            object_sizes: vec![KB, 64 * KB, MB],
            timeout: Duration::from_secs(30),
            parallel_timeout: None,
            detect_timeout: Duration::from_secs(15),
            file_counts: vec![1, 10, 100, 1000],
            multipart_part_size: 5 * MB,
            multipart_parts: 3,
            filter: None,
            cleanup: false,
            drivers: Vec::new(),
        }
    }
}

impl BenchConfig {
    /// Short run for smoke testing.
    #[must_use]
    pub fn quick(mut self) -> Self {
        self.bench_time = Duration::from_millis(200);
        self.warmup_iterations = 1;
        self.object_sizes = vec![KB, 64 * KB];
        self.concurrency_levels = vec![1, 10];
        self.file_counts = vec![10, 100];
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.drivers.is_empty() {
            return Err(Error::NoDrivers);
        }
        if self.concurrency == 0 || self.concurrency_levels.contains(&0) {
            return Err(Error::InvalidConcurrency);
        }
        if self.max_bench_iterations == 0 || self.max_bench_iterations < self.min_bench_iterations
        {
            return Err(Error::InvalidIterations);
        }
        if self.object_sizes.is_empty() {
            return Err(Error::InvalidSizes);
        }
        Ok(())
    }

    /// Large objects get a shorter target so a run stays bounded.
    pub fn bench_time_for_size(&self, size: u64) -> Duration {
        if size >= 100 * MB {
            self.bench_time / 4
        } else if size >= 10 * MB {
            self.bench_time / 2
        } else {
            self.bench_time
        }
    }

    pub fn warmup_for_size(&self, size: u64) -> u64 {
        if size >= 100 * MB {
            self.warmup_iterations.min(1)
        } else if size >= 10 * MB {
            self.warmup_iterations.min(2)
        } else {
            self.warmup_iterations
        }
    }

    /// Per-operation timeout, raised for large objects. `None` means no timeout.
    pub fn timeout_for_size(&self, size: u64) -> Option<Duration> {
        if self.timeout.is_zero() {
            return None;
        }
        let floor = if size >= 100 * MB {
            Duration::from_secs(5 * 60)
        } else if size >= 10 * MB {
            Duration::from_secs(2 * 60)
        } else {
            Duration::ZERO
        };
        Some(self.timeout.max(floor))
    }

    /// Whole-scenario budget for parallel scenarios.
    pub fn parallel_timeout(&self) -> Option<Duration> {
        self.parallel_timeout
            .or((!self.timeout.is_zero()).then_some(self.timeout))
    }

    pub fn multipart_total(&self) -> u64 {
        self.multipart_part_size
            .saturating_mul(u64::from(self.multipart_parts))
    }

    pub fn matches_filter(&self, label: &str) -> bool {
        self.filter
            .as_deref()
            .is_none_or(|f| f.is_empty() || label.contains(f))
    }
}
