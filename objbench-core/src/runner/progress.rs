use std::time::Duration;

use objbench_metrics::Metrics;

use crate::report::SkippedBenchmark;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum RunState {
    #[strum(serialize = "idle")]
    Idle,
    #[strum(serialize = "detecting")]
    DetectingBackends,
    #[strum(serialize = "benchmarking")]
    Benchmarking,
    #[strum(serialize = "aggregating")]
    Aggregating,
    #[strum(serialize = "done")]
    Done,
    #[strum(serialize = "cancelled")]
    Cancelled,
}

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    State(RunState),

    BackendDetected {
        driver: String,
        available: bool,
        reason: Option<String>,
    },

    /// 1-based position among reachable backends.
    BackendStarted {
        driver: String,
        index: usize,
        total: usize,
    },

    BackendFinished {
        driver: String,
    },

    ScenarioStarted {
        driver: String,
        scenario: String,
        target: Duration,
    },

    /// Emitted after every adaptive round with cumulative totals.
    RoundCompleted {
        driver: String,
        scenario: String,
        iterations: u64,
        errors: u64,
        elapsed: Duration,
        target: Duration,
    },

    ScenarioFinished(Metrics),

    ScenarioFailed {
        driver: String,
        scenario: String,
        error: String,
    },

    Skipped(SkippedBenchmark),
}

pub type ProgressFn = std::sync::Arc<dyn Fn(ProgressEvent) + Send + Sync + 'static>;
