use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use objbench_core::{BenchConfig, DriverConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct BenchDocYaml {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bench_time: Option<YamlDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_iterations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warmup: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency_levels: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_sizes: Option<Vec<YamlSize>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<YamlDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_timeout: Option<YamlDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detect_timeout: Option<YamlDuration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_counts: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multipart: Option<MultipartYaml>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drivers: Vec<DriverYaml>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct MultipartYaml {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_size: Option<YamlSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct DriverYaml {
    pub name: String,
    pub dsn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct YamlDuration(Duration);

impl YamlDuration {
    fn into_inner(self) -> Duration {
        self.0
    }
}

impl Serialize for YamlDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(self.0).to_string())
    }
}

impl<'de> Deserialize<'de> for YamlDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = YamlDuration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 500ms), integer seconds, or float seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(YamlDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(|v| YamlDuration(Duration::from_secs(v)))
                    .map_err(|_| E::custom("duration must not be negative"))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if !v.is_finite() || v < 0.0 {
                    return Err(E::custom("duration must be a non-negative, finite number"));
                }
                Ok(YamlDuration(Duration::from_secs_f64(v)))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let d = humantime::parse_duration(v).map_err(E::custom)?;
                Ok(YamlDuration(d))
            }
        }

        deserializer.deserialize_any(V)
    }
}

/// Byte size written as `64KB`/`1MiB` or a plain byte count.
#[derive(Debug, Clone, Copy)]
pub(crate) struct YamlSize(u64);

impl Serialize for YamlSize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&objbench_core::size_label(self.0))
    }
}

impl<'de> Deserialize<'de> for YamlSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = YamlSize;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("size as string (e.g. 64KB) or integer bytes")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(YamlSize(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(YamlSize)
                    .map_err(|_| E::custom("size must not be negative"))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                objbench_core::parse_size(v).map(YamlSize).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(V)
    }
}

pub(crate) async fn load_bench_yaml(path: &Path) -> anyhow::Result<BenchDocYaml> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read config YAML: {}", path.display()))?;

    serde_yaml::from_slice(&bytes)
        .with_context(|| format!("failed to parse YAML: {}", path.display()))
}

impl BenchDocYaml {
    /// Overlays every field the document sets onto `cfg`.
    pub(crate) fn apply(self, cfg: &mut BenchConfig) -> anyhow::Result<()> {
        if let Some(v) = self.bench_time {
            cfg.bench_time = v.into_inner();
        }
        if let Some(v) = self.min_iterations {
            cfg.min_bench_iterations = v;
        }
        if let Some(v) = self.max_iterations {
            cfg.max_bench_iterations = v;
        }
        if let Some(v) = self.warmup {
            cfg.warmup_iterations = v;
        }
        if let Some(v) = self.concurrency {
            cfg.concurrency = v;
        }
        if let Some(v) = self.concurrency_levels {
            cfg.concurrency_levels = v;
        }
        if let Some(v) = self.object_sizes {
            cfg.object_sizes = v.into_iter().map(|s| s.0).collect();
        }
        if let Some(v) = self.timeout {
            cfg.timeout = v.into_inner();
        }
        if let Some(v) = self.parallel_timeout {
            cfg.parallel_timeout = Some(v.into_inner());
        }
        if let Some(v) = self.detect_timeout {
            cfg.detect_timeout = v.into_inner();
        }
        if let Some(v) = self.file_counts {
            cfg.file_counts = v;
        }
        if let Some(mp) = self.multipart {
            if let Some(v) = mp.part_size {
                cfg.multipart_part_size = v.0;
            }
            if let Some(v) = mp.parts {
                cfg.multipart_parts = v;
            }
        }
        if self.filter.is_some() {
            cfg.filter = self.filter;
        }
        if let Some(v) = self.cleanup {
            cfg.cleanup = v;
        }

        if !self.drivers.is_empty() {
            let mut drivers = Vec::with_capacity(self.drivers.len());
            for d in self.drivers {
                if d.name.trim().is_empty() || !d.dsn.contains("://") {
                    anyhow::bail!("invalid driver `{}` (expected name and a DSN with a scheme)", d.name);
                }
                let mut driver = DriverConfig::new(d.name, d.dsn);
                if let Some(bucket) = d.bucket.or_else(|| self.bucket.clone()) {
                    driver = driver.with_bucket(bucket);
                }
                if let Some(max) = d.max_concurrency {
                    driver = driver.with_max_concurrency(max);
                }
                drivers.push(driver);
            }
            cfg.drivers = drivers;
        } else if let Some(bucket) = self.bucket {
            for d in &mut cfg.drivers {
                d.bucket.clone_from(&bucket);
            }
        }

        Ok(())
    }
}
