use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use objbench_metrics::Metrics;
use serde::{Deserialize, Serialize};

use crate::config::BenchConfig;
use crate::probe::ResourceUsage;

/// A scenario that was deliberately not attempted against a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedBenchmark {
    pub driver: String,
    pub operation: String,
    pub reason: String,
}

impl SkippedBenchmark {
    pub fn new(
        driver: impl Into<String>,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            driver: driver.into(),
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub timestamp: DateTime<Utc>,
    pub config: BenchConfig,
    pub results: Vec<Metrics>,
    #[serde(default)]
    pub skipped: Vec<SkippedBenchmark>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_usage: BTreeMap<String, ResourceUsage>,
}

impl Report {
    pub fn new(config: BenchConfig) -> Self {
        Self {
            timestamp: Utc::now(),
            config,
            results: Vec::new(),
            skipped: Vec::new(),
            resource_usage: BTreeMap::new(),
        }
    }

    /// Backends in the order their results first appear.
    pub fn drivers(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for m in &self.results {
            if !out.contains(&m.driver.as_str()) {
                out.push(&m.driver);
            }
        }
        out
    }

    pub fn find(&self, driver: &str, operation: &str) -> Option<&Metrics> {
        self.results
            .iter()
            .find(|m| m.driver == driver && m.operation == operation)
    }

    pub fn total_errors(&self) -> u64 {
        self.results.iter().map(|m| m.errors).sum()
    }
}
