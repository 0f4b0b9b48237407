use std::fmt::Display;
use std::time::Duration;

use parking_lot::Mutex;

use crate::metrics::Metrics;

#[derive(Debug, Default)]
struct Samples {
    latencies: Vec<Duration>,
    ttfbs: Vec<Duration>,
    errors: u64,
    last_error: Option<String>,
}

/// Accumulates outcomes for one scenario. Safe to share across workers.
#[derive(Debug, Default)]
pub struct Collector {
    inner: Mutex<Samples>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, latency: Duration) {
        self.inner.lock().latencies.push(latency);
    }

    /// A zero `ttfb` means no byte was observed and only the latency is kept.
    pub fn record_success_with_ttfb(&self, latency: Duration, ttfb: Duration) {
        let mut inner = self.inner.lock();
        inner.latencies.push(latency);
        if !ttfb.is_zero() {
            inner.ttfbs.push(ttfb);
        }
    }

    pub fn record_failure(&self, err: &dyn Display) {
        let msg = err.to_string();
        let mut inner = self.inner.lock();
        inner.errors = inner.errors.saturating_add(1);
        inner.last_error = Some(msg);
    }

    pub fn iterations(&self) -> u64 {
        self.inner.lock().latencies.len() as u64
    }

    pub fn errors(&self) -> u64 {
        self.inner.lock().errors
    }

    /// Successes plus failures recorded so far.
    pub fn outcomes(&self) -> u64 {
        let inner = self.inner.lock();
        (inner.latencies.len() as u64).saturating_add(inner.errors)
    }

    /// Summarizes a copy of the current samples; the lock is not held while sorting.
    pub fn snapshot(&self, operation: &str, driver: &str, object_size: u64) -> Metrics {
        let (mut latencies, mut ttfbs, errors, last_error) = {
            let inner = self.inner.lock();
            (
                inner.latencies.clone(),
                inner.ttfbs.clone(),
                inner.errors,
                inner.last_error.clone(),
            )
        };

        Metrics::compute(
            operation,
            driver,
            object_size,
            &mut latencies,
            &mut ttfbs,
            errors,
            last_error,
        )
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.latencies.clear();
        inner.ttfbs.clear();
        inner.errors = 0;
        inner.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn failures_are_excluded_from_latency() {
        let c = Collector::new();
        c.record_success(ms(10));
        c.record_failure(&"timeout");
        c.record_success(ms(30));
        c.record_failure(&"not found");

        let m = c.snapshot("Write/1KB", "memory", 1024);
        assert_eq!(m.iterations, 2);
        assert_eq!(m.errors, 2);
        assert_eq!(m.last_error.as_deref(), Some("not found"));
        assert_eq!(m.latency.min, ms(10));
        assert_eq!(m.latency.max, ms(30));
        assert_eq!(m.total_duration, ms(40));
    }

    #[test]
    fn zero_ttfb_is_not_recorded() {
        let c = Collector::new();
        c.record_success_with_ttfb(ms(10), ms(2));
        c.record_success_with_ttfb(ms(12), Duration::ZERO);

        let m = c.snapshot("Read/1KB", "memory", 1024);
        assert_eq!(m.iterations, 2);
        assert_eq!(m.ttfb.samples, 1);
        assert_eq!(m.ttfb.p50, ms(2));
    }

    #[test]
    fn snapshot_leaves_samples_intact() {
        let c = Collector::new();
        c.record_success(ms(5));
        let _ = c.snapshot("Stat", "memory", 0);
        assert_eq!(c.iterations(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let c = Collector::new();
        c.record_success_with_ttfb(ms(1), ms(1));
        c.record_failure(&"x");
        c.reset();

        let m = c.snapshot("Stat", "memory", 0);
        assert_eq!(m.iterations, 0);
        assert_eq!(m.errors, 0);
        assert_eq!(m.ttfb.samples, 0);
        assert!(m.last_error.is_none());
    }
}
