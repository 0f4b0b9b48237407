use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use objbench_metrics::{Collector, Metrics};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::progress::{ProgressEvent, ProgressFn};
use crate::adaptive::AdaptiveController;
use crate::error::{Error, Result};
use crate::storage;

/// Runs `fut` under an optional per-operation timeout.
pub(crate) async fn with_timeout<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = storage::Result<T>>,
) -> storage::Result<T> {
    match limit {
        None => fut.await,
        Some(d) => tokio::time::timeout(d, fut)
            .await
            .unwrap_or_else(|_| Err(storage::Error::Timeout(d))),
    }
}

/// The per-iteration strategy of one scenario.
#[async_trait]
pub(crate) trait ScenarioOp: Send + Sync + 'static {
    /// Untimed fixtures, created once before warm-up.
    async fn prepare(&self) -> storage::Result<()> {
        Ok(())
    }

    /// Untimed setup before a batch of `n` operations.
    async fn prepare_round(&self, _n: u64) -> storage::Result<()> {
        Ok(())
    }

    /// One timed operation. Read-shaped operations return their time to first byte.
    async fn execute(&self, seq: u64, started: Instant) -> storage::Result<Option<Duration>>;
}

#[derive(Debug, Clone)]
pub(crate) struct Plan {
    pub bench_time: Duration,
    pub min_iterations: u64,
    pub max_iterations: u64,
    pub warmup: u64,
    pub op_timeout: Option<Duration>,
    /// 1 runs operations inline on the coordinator.
    pub workers: usize,
    /// Whole-scenario budget, measured from the start of warm-up.
    pub deadline: Option<Duration>,
}

pub(crate) struct ScenarioContext<'a> {
    pub driver: &'a str,
    pub label: &'a str,
    pub object_size: u64,
    pub cancel: &'a CancellationToken,
    pub progress: Option<&'a ProgressFn>,
}

/// Fixtures, warm-up, adaptive rounds, snapshot.
pub(crate) async fn run_adaptive(
    op: Arc<dyn ScenarioOp>,
    plan: &Plan,
    ctx: &ScenarioContext<'_>,
) -> Result<Metrics> {
    let setup = |source| Error::Setup {
        scenario: ctx.label.to_string(),
        source,
    };

    op.prepare().await.map_err(setup)?;

    let scope = ctx.cancel.child_token();
    let _scope_guard = scope.clone().drop_guard();
    let timed_out = Arc::new(AtomicBool::new(false));
    if let Some(limit) = plan.deadline {
        spawn_deadline(scope.clone(), limit, timed_out.clone());
    }

    let seq = Arc::new(AtomicU64::new(0));

    if plan.warmup > 0 && !scope.is_cancelled() {
        op.prepare_round(plan.warmup).await.map_err(setup)?;
        let sink = Arc::new(Collector::new());
        let done = run_round(&op, &sink, plan.warmup, 1, plan.op_timeout, &scope, &seq).await;
        debug!(
            driver = ctx.driver,
            scenario = ctx.label,
            warmup = done,
            errors = sink.errors(),
            "warm-up finished"
        );
    }

    let collector = Arc::new(Collector::new());
    let mut ctl = AdaptiveController::new(
        plan.bench_time,
        plan.min_iterations,
        plan.max_iterations,
        scope.clone(),
    );

    let mut setup_failure = None;
    while ctl.should_continue() {
        let n = ctl.next_round_size();
        if let Err(err) = op.prepare_round(n).await {
            // Rounds already scored are kept.
            if ctl.total_iterations() == 0 {
                return Err(setup(err));
            }
            warn!(
                driver = ctx.driver,
                scenario = ctx.label,
                "round setup failed: {err}"
            );
            setup_failure = Some(err);
            break;
        }

        let started = Instant::now();
        let completed = run_round(
            &op,
            &collector,
            n,
            plan.workers,
            plan.op_timeout,
            &scope,
            &seq,
        )
        .await;
        ctl.record_round(completed, started.elapsed());

        if let Some(progress) = ctx.progress {
            progress(ProgressEvent::RoundCompleted {
                driver: ctx.driver.to_string(),
                scenario: ctx.label.to_string(),
                iterations: ctl.total_iterations(),
                errors: collector.errors(),
                elapsed: ctl.total_elapsed(),
                target: ctl.target(),
            });
        }
    }

    let mut metrics = collector.snapshot(ctx.label, ctx.driver, ctx.object_size);
    if let Some(err) = setup_failure {
        metrics = metrics.with_note(format!("stopped early: round setup failed: {err}"));
    } else if timed_out.load(Ordering::Acquire) {
        let limit = plan.deadline.unwrap_or_default();
        warn!(
            driver = ctx.driver,
            scenario = ctx.label,
            "scenario timed out after {limit:?}"
        );
        metrics = metrics.with_note(format!(
            "stopped early: scenario timeout after {}",
            humantime::format_duration(limit)
        ));
    } else if ctx.cancel.is_cancelled() {
        metrics = metrics.with_note("stopped early: run cancelled");
    }
    Ok(metrics)
}

fn spawn_deadline(scope: CancellationToken, limit: Duration, timed_out: Arc<AtomicBool>) {
    tokio::spawn(async move {
        tokio::select! {
            () = tokio::time::sleep(limit) => {
                timed_out.store(true, Ordering::Release);
                scope.cancel();
            }
            () = scope.cancelled() => {}
        }
    });
}

/// Runs up to `n` operations and returns how many completed.
///
/// Dispatch stops once `stop` fires; operations already started finish.
async fn run_round(
    op: &Arc<dyn ScenarioOp>,
    collector: &Arc<Collector>,
    n: u64,
    workers: usize,
    op_timeout: Option<Duration>,
    stop: &CancellationToken,
    seq: &Arc<AtomicU64>,
) -> u64 {
    if workers <= 1 {
        let mut done = 0;
        while done < n && !stop.is_cancelled() {
            let i = seq.fetch_add(1, Ordering::Relaxed);
            run_one(op.as_ref(), collector, i, op_timeout).await;
            done += 1;
        }
        return done;
    }

    let next = Arc::new(AtomicU64::new(0));
    let completed = Arc::new(AtomicU64::new(0));
    let pool = u64::try_from(workers).unwrap_or(u64::MAX).min(n);

    let mut set = JoinSet::new();
    for _ in 0..pool {
        let op = op.clone();
        let collector = collector.clone();
        let stop = stop.clone();
        let seq = seq.clone();
        let next = next.clone();
        let completed = completed.clone();

        set.spawn(async move {
            while !stop.is_cancelled() && next.fetch_add(1, Ordering::Relaxed) < n {
                let i = seq.fetch_add(1, Ordering::Relaxed);
                run_one(op.as_ref(), &collector, i, op_timeout).await;
                completed.fetch_add(1, Ordering::Relaxed);
            }
        });
    }

    while let Some(res) = set.join_next().await {
        if let Err(err) = res {
            warn!(error = %err, "benchmark worker failed");
        }
    }

    completed.load(Ordering::Relaxed)
}

async fn run_one(
    op: &dyn ScenarioOp,
    collector: &Collector,
    seq: u64,
    op_timeout: Option<Duration>,
) {
    let started = Instant::now();
    let res = with_timeout(op_timeout, op.execute(seq, started)).await;
    let latency = started.elapsed();

    match res {
        Ok(Some(ttfb)) => collector.record_success_with_ttfb(latency, ttfb),
        Ok(None) => collector.record_success(latency),
        Err(err) => collector.record_failure(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sleepy {
        delay: Duration,
        in_flight: AtomicU64,
        peak: AtomicU64,
    }

    #[async_trait]
    impl ScenarioOp for Sleepy {
        async fn execute(&self, _seq: u64, _started: Instant) -> storage::Result<Option<Duration>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    fn sleepy(ms: u64) -> Arc<Sleepy> {
        Arc::new(Sleepy {
            delay: Duration::from_millis(ms),
            in_flight: AtomicU64::new(0),
            peak: AtomicU64::new(0),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_round_bounds_in_flight_operations() {
        let op = sleepy(10);
        let dyn_op: Arc<dyn ScenarioOp> = op.clone();
        let collector = Arc::new(Collector::new());
        let stop = CancellationToken::new();
        let seq = Arc::new(AtomicU64::new(0));

        let started = Instant::now();
        let done = run_round(&dyn_op, &collector, 20, 4, None, &stop, &seq).await;

        assert_eq!(done, 20);
        assert_eq!(collector.iterations(), 20);
        assert_eq!(op.peak.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_millis(50));
        assert_eq!(seq.load(Ordering::SeqCst), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn per_operation_timeout_is_a_failure() {
        let op: Arc<dyn ScenarioOp> = sleepy(100);
        let collector = Arc::new(Collector::new());
        let stop = CancellationToken::new();
        let seq = Arc::new(AtomicU64::new(0));

        let done = run_round(
            &op,
            &collector,
            3,
            1,
            Some(Duration::from_millis(20)),
            &stop,
            &seq,
        )
        .await;

        assert_eq!(done, 3);
        let m = collector.snapshot("Write/1KB", "mem", 1024);
        assert_eq!(m.iterations, 0);
        assert_eq!(m.errors, 3);
        assert!(m.last_error.is_some_and(|e| e.contains("timed out")));
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_deadline_scores_completed_operations() {
        let op: Arc<dyn ScenarioOp> = sleepy(10);
        let cancel = CancellationToken::new();
        let plan = Plan {
            bench_time: Duration::from_secs(10),
            min_iterations: 1,
            max_iterations: 1_000_000,
            warmup: 0,
            op_timeout: None,
            workers: 2,
            deadline: Some(Duration::from_millis(55)),
        };
        let ctx = ScenarioContext {
            driver: "mem",
            label: "ParallelWrite/1KB/C2",
            object_size: 1024,
            cancel: &cancel,
            progress: None,
        };

        let m = match run_adaptive(op, &plan, &ctx).await {
            Ok(m) => m,
            Err(err) => panic!("scenario failed: {err}"),
        };

        // 1 op in the first round, then 2 workers x 10ms from t=10ms.
        // Operations in flight at the 55ms mark still finish.
        assert_eq!(m.iterations, 11);
        assert!(m.note.is_some_and(|n| n.contains("timeout")));
        assert!(!cancel.is_cancelled());
    }

    /// Fails the round setup with the given 0-based index.
    struct FailingSetup {
        fail_on: u64,
        rounds: AtomicU64,
    }

    #[async_trait]
    impl ScenarioOp for FailingSetup {
        async fn prepare_round(&self, _n: u64) -> storage::Result<()> {
            if self.rounds.fetch_add(1, Ordering::SeqCst) == self.fail_on {
                return Err(storage::Error::Backend("staging rejected".into()));
            }
            Ok(())
        }

        async fn execute(&self, _seq: u64, _started: Instant) -> storage::Result<Option<Duration>> {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok(None)
        }
    }

    fn sequential_plan() -> Plan {
        Plan {
            bench_time: Duration::from_secs(1),
            min_iterations: 1,
            max_iterations: 1000,
            warmup: 0,
            op_timeout: None,
            workers: 1,
            deadline: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_round_setup_keeps_scored_rounds() {
        let op: Arc<dyn ScenarioOp> = Arc::new(FailingSetup {
            fail_on: 1,
            rounds: AtomicU64::new(0),
        });
        let cancel = CancellationToken::new();
        let ctx = ScenarioContext {
            driver: "mem",
            label: "Delete",
            object_size: 1024,
            cancel: &cancel,
            progress: None,
        };

        let m = run_adaptive(op, &sequential_plan(), &ctx)
            .await
            .unwrap_or_else(|e| panic!("scenario failed: {e}"));

        assert_eq!(m.iterations, 1);
        assert!(m.note.is_some_and(|n| n.contains("round setup failed")));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_first_round_setup_is_a_setup_error() {
        let op: Arc<dyn ScenarioOp> = Arc::new(FailingSetup {
            fail_on: 0,
            rounds: AtomicU64::new(0),
        });
        let cancel = CancellationToken::new();
        let ctx = ScenarioContext {
            driver: "mem",
            label: "Delete",
            object_size: 1024,
            cancel: &cancel,
            progress: None,
        };

        let res = run_adaptive(op, &sequential_plan(), &ctx).await;
        assert!(matches!(res, Err(Error::Setup { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_runs_no_rounds() {
        let op = sleepy(10);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let plan = Plan {
            bench_time: Duration::from_secs(1),
            min_iterations: 3,
            max_iterations: 100,
            warmup: 5,
            op_timeout: None,
            workers: 1,
            deadline: None,
        };
        let ctx = ScenarioContext {
            driver: "mem",
            label: "Write/1KB",
            object_size: 1024,
            cancel: &cancel,
            progress: None,
        };

        let m = run_adaptive(op.clone(), &plan, &ctx).await.ok();
        assert_eq!(m.as_ref().map(|m| m.iterations), Some(0));
        assert_eq!(op.peak.load(Ordering::SeqCst), 0);
    }
}
