//! Adaptive benchmark engine for object-storage backends.

mod adaptive;
mod compare;
mod config;
mod error;
mod keys;
mod probe;
mod report;
mod serde_util;
mod size;
mod ttfb;

pub mod runner;
pub mod storage;

pub use adaptive::AdaptiveController;
pub use compare::{Comparison, SIGNIFICANT_CHANGE_PCT, Verdict, compare_reports, has_regressions};
pub use config::{BenchConfig, DEFAULT_BUCKET, DriverConfig};
pub use error::{Error, Result};
pub use keys::{KeyGen, random_payload};
pub use probe::{ResourceProbe, ResourceUsage};
pub use report::{Report, SkippedBenchmark};
pub use size::{GB, KB, MB, parse_size, parse_size_list, size_label};
pub use ttfb::TtfbReader;

pub use objbench_metrics::{Collector, DurationStats, Metrics};
