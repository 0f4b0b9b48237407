use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::execute::{ScenarioContext, ScenarioOp, run_adaptive, with_timeout};
use super::filecount::run_file_count;
use super::ops::{
    CopyOp, DeleteOp, EdgeCaseOp, ListOp, MixedOp, MultipartOp, PARALLEL_READ_POOL, READ_POOL,
    RangeReadOp, ReadOp, StatOp, Target, WriteOp,
};
use super::progress::{ProgressEvent, ProgressFn, RunState};
use super::scenario::{Scenario, ScenarioKind};
use super::suite::{RANGE_OBJECT_SIZE, SuiteEntry, plan_for, plan_suite};
use crate::config::{BenchConfig, DriverConfig};
use crate::error::{Error, Result};
use crate::keys::KeyGen;
use crate::probe::ResourceProbe;
use crate::report::{Report, SkippedBenchmark};
use crate::storage::{self, Bucket, ByteRange, Registry, Storage};

const PROBE_TIMEOUT_CAP: Duration = Duration::from_secs(10);

/// What a run produced. A cancelled run still carries its partial report.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: Report,
    pub cancelled: bool,
}

/// Drives the benchmark campaign across every configured backend.
pub struct Runner {
    config: BenchConfig,
    registry: Registry,
    progress: Option<ProgressFn>,
    probe: Option<Arc<dyn ResourceProbe>>,
    keys: Arc<KeyGen>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("progress", &self.progress.is_some())
            .field("probe", &self.probe.is_some())
            .finish()
    }
}

struct Backend {
    config: DriverConfig,
    store: Arc<dyn Storage>,
}

impl Runner {
    pub fn new(config: BenchConfig, registry: Registry) -> Self {
        Self {
            config,
            registry,
            progress: None,
            probe: None,
            keys: Arc::new(KeyGen::new()),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    #[must_use]
    pub fn with_resource_probe(mut self, probe: Arc<dyn ResourceProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Runs every scenario against every reachable backend.
    ///
    /// Fails only on invalid configuration or when no backend is reachable.
    /// Cancellation is reported through [`RunOutcome::cancelled`].
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunOutcome> {
        self.config.validate()?;
        let mut report = Report::new(self.config.clone());

        self.emit(ProgressEvent::State(RunState::Idle));
        self.emit(ProgressEvent::State(RunState::DetectingBackends));
        let backends = self.detect_backends(&cancel).await;

        if cancel.is_cancelled() {
            return Ok(self.cancelled(report));
        }
        if backends.is_empty() {
            return Err(Error::NoBackendsAvailable);
        }

        self.emit(ProgressEvent::State(RunState::Benchmarking));
        let total = backends.len();
        for (i, backend) in backends.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            let name = backend.config.name.clone();
            info!(driver = %name, "benchmarking backend {}/{total}", i + 1);
            self.emit(ProgressEvent::BackendStarted {
                driver: name.clone(),
                index: i + 1,
                total,
            });

            self.bench_backend(backend, &mut report, &cancel).await;
            self.finish_backend(backend, &mut report, &cancel).await;

            self.emit(ProgressEvent::BackendFinished { driver: name });
        }

        if cancel.is_cancelled() {
            return Ok(self.cancelled(report));
        }

        self.emit(ProgressEvent::State(RunState::Aggregating));
        info!(
            results = report.results.len(),
            skipped = report.skipped.len(),
            "run finished"
        );
        self.emit(ProgressEvent::State(RunState::Done));
        Ok(RunOutcome {
            report,
            cancelled: false,
        })
    }

    fn cancelled(&self, report: Report) -> RunOutcome {
        warn!(results = report.results.len(), "run cancelled");
        self.emit(ProgressEvent::State(RunState::Cancelled));
        RunOutcome {
            report,
            cancelled: true,
        }
    }

    fn emit(&self, ev: ProgressEvent) {
        if let Some(progress) = &self.progress {
            progress(ev);
        }
    }

    async fn detect_backends(&self, cancel: &CancellationToken) -> Vec<Backend> {
        let mut out = Vec::new();
        for driver in &self.config.drivers {
            if cancel.is_cancelled() {
                break;
            }
            let res = tokio::select! {
                res = self.detect(driver) => res,
                () = cancel.cancelled() => break,
            };
            match res {
                Ok(store) => {
                    info!(driver = %driver.name, dsn = %driver.dsn, "backend available");
                    self.emit(ProgressEvent::BackendDetected {
                        driver: driver.name.clone(),
                        available: true,
                        reason: None,
                    });
                    out.push(Backend {
                        config: driver.clone(),
                        store,
                    });
                }
                Err(reason) => {
                    warn!(driver = %driver.name, dsn = %driver.dsn, "backend unavailable: {reason}");
                    self.emit(ProgressEvent::BackendDetected {
                        driver: driver.name.clone(),
                        available: false,
                        reason: Some(reason),
                    });
                }
            }
        }
        out
    }

    async fn detect(&self, driver: &DriverConfig) -> std::result::Result<Arc<dyn Storage>, String> {
        let limit = self.config.detect_timeout;
        let store = match tokio::time::timeout(limit, self.registry.open(&driver.dsn)).await {
            Ok(Ok(store)) => store,
            Ok(Err(err)) => return Err(format!("open failed: {err}")),
            Err(_) => return Err(format!("open timed out after {limit:?}")),
        };

        let probe_limit = limit.min(PROBE_TIMEOUT_CAP);
        if let Err(reason) = check_store(store.as_ref(), &driver.bucket, probe_limit).await {
            if let Err(err) = with_timeout(Some(probe_limit), store.close()).await {
                debug!(driver = %driver.name, "close after failed probe: {err}");
            }
            return Err(reason);
        }

        Ok(store)
    }

    async fn bench_backend(&self, backend: &Backend, report: &mut Report, cancel: &CancellationToken) {
        let driver = &backend.config;
        let bucket = backend.store.bucket(&driver.bucket);

        for entry in plan_suite(&self.config, driver) {
            if cancel.is_cancelled() {
                break;
            }
            match entry {
                SuiteEntry::Skip(skip) => self.skip(report, skip),
                SuiteEntry::Run(scenario) => {
                    if matches!(scenario.kind, ScenarioKind::Multipart { .. })
                        && bucket.multipart().is_none()
                    {
                        self.skip(
                            report,
                            SkippedBenchmark::new(
                                &driver.name,
                                scenario.label,
                                "multipart upload not supported",
                            ),
                        );
                        continue;
                    }
                    self.run_scenario(&scenario, driver, &bucket, report, cancel)
                        .await;
                }
            }
        }
    }

    fn skip(&self, report: &mut Report, skip: SkippedBenchmark) {
        info!(driver = %skip.driver, scenario = %skip.operation, "skipped: {}", skip.reason);
        self.emit(ProgressEvent::Skipped(skip.clone()));
        report.skipped.push(skip);
    }

    async fn run_scenario(
        &self,
        scenario: &Scenario,
        driver: &DriverConfig,
        bucket: &Arc<dyn Bucket>,
        report: &mut Report,
        cancel: &CancellationToken,
    ) {
        let plan = plan_for(&self.config, scenario);
        let target = Target {
            bucket: bucket.clone(),
            keys: self.keys.clone(),
            timeout: plan.op_timeout,
        };

        debug!(driver = %driver.name, scenario = %scenario.label, ?plan, "scenario starting");
        self.emit(ProgressEvent::ScenarioStarted {
            driver: driver.name.clone(),
            scenario: scenario.label.clone(),
            target: plan.bench_time,
        });

        if let ScenarioKind::FileCount { files } = scenario.kind {
            for m in run_file_count(&target, &driver.name, files, cancel).await {
                self.emit(ProgressEvent::ScenarioFinished(m.clone()));
                report.results.push(m);
            }
            return;
        }

        let Some(op) = build_op(scenario, target) else {
            return;
        };
        let ctx = ScenarioContext {
            driver: &driver.name,
            label: &scenario.label,
            object_size: scenario.size(),
            cancel,
            progress: self.progress.as_ref(),
        };

        match run_adaptive(op, &plan, &ctx).await {
            Ok(m) => {
                debug!(
                    driver = %driver.name,
                    scenario = %scenario.label,
                    iterations = m.iterations,
                    errors = m.errors,
                    "scenario finished"
                );
                self.emit(ProgressEvent::ScenarioFinished(m.clone()));
                report.results.push(m);
            }
            Err(err) => {
                warn!(driver = %driver.name, scenario = %scenario.label, "scenario failed: {err}");
                self.emit(ProgressEvent::ScenarioFailed {
                    driver: driver.name.clone(),
                    scenario: scenario.label.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    /// Post-backend housekeeping. Every call is bounded by the base operation timeout.
    async fn finish_backend(&self, backend: &Backend, report: &mut Report, cancel: &CancellationToken) {
        let driver = &backend.config;
        let limit = self.config.timeout_for_size(0);

        if self.config.cleanup && !cancel.is_cancelled() {
            let bucket = backend.store.bucket(&driver.bucket);
            tokio::select! {
                res = cleanup_bucket(bucket.as_ref(), limit) => match res {
                    Ok(n) => info!(driver = %driver.name, removed = n, "bucket cleaned up"),
                    Err(err) => warn!(driver = %driver.name, "cleanup failed: {err}"),
                },
                () = cancel.cancelled() => warn!(driver = %driver.name, "cleanup interrupted by cancellation"),
            }
        }

        if let Some(probe) = &self.probe {
            let sample = with_timeout(limit, async {
                Ok::<_, storage::Error>(probe.sample(driver).await)
            });
            match sample.await {
                Ok(Some(usage)) => {
                    report.resource_usage.insert(driver.name.clone(), usage);
                }
                Ok(None) => {}
                Err(err) => warn!(driver = %driver.name, "resource probe failed: {err}"),
            }
        }

        if let Err(err) = with_timeout(limit, backend.store.close()).await {
            warn!(driver = %driver.name, "close failed: {err}");
        }
    }
}

/// `None` for scenarios that run outside the adaptive loop.
fn build_op(scenario: &Scenario, target: Target) -> Option<Arc<dyn ScenarioOp>> {
    let prefix = format!("bench/{}", scenario.label);
    let size = scenario.size();
    let op: Arc<dyn ScenarioOp> = match scenario.kind {
        ScenarioKind::Write | ScenarioKind::ParallelWrite => {
            Arc::new(WriteOp::new(target, &prefix, size))
        }
        ScenarioKind::Read => Arc::new(ReadOp::new(target, &prefix, size, READ_POOL)),
        ScenarioKind::ParallelRead => {
            Arc::new(ReadOp::new(target, &prefix, size, PARALLEL_READ_POOL))
        }
        ScenarioKind::Stat => Arc::new(StatOp::new(target, &prefix)),
        ScenarioKind::List { objects } => Arc::new(ListOp::new(target, &prefix, objects)),
        ScenarioKind::Delete => Arc::new(DeleteOp::new(target, &prefix)),
        ScenarioKind::RangeRead { offset, length } => Arc::new(RangeReadOp::new(
            target,
            &prefix,
            RANGE_OBJECT_SIZE,
            ByteRange::new(offset, length),
        )),
        ScenarioKind::Copy => Arc::new(CopyOp::new(target, &prefix, size)),
        ScenarioKind::Mixed { read_percent } => {
            Arc::new(MixedOp::new(target, &prefix, size, read_percent))
        }
        ScenarioKind::Multipart { part_size, parts } => {
            Arc::new(MultipartOp::new(target, &prefix, part_size, parts))
        }
        ScenarioKind::EdgeCase(case) => Arc::new(EdgeCaseOp::new(target, &prefix, case)),
        ScenarioKind::FileCount { .. } => return None,
    };
    Some(op)
}

/// Connectivity probe plus bucket creation; an existing bucket is fine.
async fn check_store(
    store: &dyn Storage,
    bucket: &str,
    limit: Duration,
) -> std::result::Result<(), String> {
    match with_timeout(Some(limit), store.list_buckets(1)).await {
        Ok(_) => {}
        Err(storage::Error::Timeout(d)) => return Err(format!("probe timed out after {d:?}")),
        Err(err) => return Err(format!("probe failed: {err}")),
    }

    match with_timeout(Some(limit), store.create_bucket(bucket)).await {
        Ok(()) | Err(storage::Error::AlreadyExists(_)) => Ok(()),
        Err(storage::Error::Timeout(d)) => Err(format!("create bucket timed out after {d:?}")),
        Err(err) => Err(format!("create bucket `{bucket}`: {err}")),
    }
}

async fn cleanup_bucket(bucket: &dyn Bucket, limit: Option<Duration>) -> storage::Result<usize> {
    let objects = with_timeout(limit, bucket.list("", 0, 0)).await?;
    let mut removed = 0;
    for obj in objects {
        match with_timeout(limit, bucket.delete(&obj.key)).await {
            Ok(()) | Err(storage::Error::NotFound(_)) => removed += 1,
            Err(err) => return Err(err),
        }
    }
    Ok(removed)
}
