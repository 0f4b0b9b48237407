use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::{DevNullDriver, Error, LocalDriver, MemoryDriver, Result, Storage};

/// Opens a [`Storage`] for one DSN scheme.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn open(&self, dsn: &Url) -> Result<Arc<dyn Storage>>;
}

/// Maps DSN schemes to drivers.
#[derive(Clone, Default)]
pub struct Registry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut schemes: Vec<&String> = self.drivers.keys().collect();
        schemes.sort();
        f.debug_struct("Registry").field("schemes", &schemes).finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `memory://`, `devnull://` and `file://`.
    pub fn with_defaults() -> Self {
        let mut r = Self::new();
        r.register("memory", Arc::new(MemoryDriver));
        r.register("devnull", Arc::new(DevNullDriver));
        r.register("file", Arc::new(LocalDriver));
        r
    }

    pub fn register(&mut self, scheme: &str, driver: Arc<dyn Driver>) {
        self.drivers.insert(scheme.to_ascii_lowercase(), driver);
    }

    pub fn schemes(&self) -> Vec<String> {
        let mut v: Vec<String> = self.drivers.keys().cloned().collect();
        v.sort();
        v
    }

    pub async fn open(&self, dsn: &str) -> Result<Arc<dyn Storage>> {
        let url = Url::parse(dsn).map_err(|_| Error::InvalidDsn(dsn.to_string()))?;
        let driver = self
            .drivers
            .get(url.scheme())
            .ok_or_else(|| Error::UnknownScheme(url.scheme().to_string()))?;
        driver.open(&url).await
    }
}
