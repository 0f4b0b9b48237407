use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::DriverConfig;

/// Resource footprint of one backend, sampled after it was benchmarked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Collects [`ResourceUsage`] for a backend. `None` means nothing to report.
#[async_trait]
pub trait ResourceProbe: Send + Sync {
    async fn sample(&self, driver: &DriverConfig) -> Option<ResourceUsage>;
}
