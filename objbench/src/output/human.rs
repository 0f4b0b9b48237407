use std::sync::Arc;

mod format;
mod progress;
mod summary;

use format::{format_rate, format_sizes};
use objbench_core::runner::{ProgressEvent, ProgressFn, RunOutcome, RunState};
use objbench_core::{BenchConfig, Comparison};
use progress::HumanProgress;

use super::OutputFormatter;
use crate::report_files::{format_latency, format_throughput};

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

fn bar_key(driver: &str, scenario: &str) -> String {
    format!("{driver} {scenario}")
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, config: &BenchConfig) {
        for d in &config.drivers {
            println!("driver: {} dsn={} bucket={}", d.name, d.dsn, d.bucket);
        }
        println!(
            "bench_time={} iterations={}..{} warmup={} sizes={} levels={:?}",
            humantime::format_duration(config.bench_time),
            config.min_bench_iterations,
            config.max_bench_iterations,
            config.warmup_iterations,
            format_sizes(&config.object_sizes),
            config.concurrency_levels,
        );
        if let Some(filter) = config.filter.as_deref().filter(|f| !f.is_empty()) {
            println!("filter: {filter}");
        }
        println!();
    }

    fn progress(&self) -> Option<ProgressFn> {
        let progress = self.progress.clone();

        Some(Arc::new(move |ev: ProgressEvent| match ev {
            ProgressEvent::State(RunState::Cancelled) => {
                progress.println("cancelled: writing partial results".to_string());
            }
            ProgressEvent::State(_) => {}
            ProgressEvent::BackendDetected {
                driver,
                available,
                reason,
            } => {
                if !available {
                    progress.println(format!(
                        "{driver}: unavailable ({})",
                        reason.as_deref().unwrap_or("unknown reason")
                    ));
                }
            }
            ProgressEvent::BackendStarted {
                driver,
                index,
                total,
            } => {
                progress.println(format!("[{index}/{total}] {driver}"));
            }
            // Bars appear with the first round; file-count phases have none.
            ProgressEvent::BackendFinished { .. } | ProgressEvent::ScenarioStarted { .. } => {}
            ProgressEvent::RoundCompleted {
                driver,
                scenario,
                iterations,
                errors,
                elapsed,
                target,
            } => {
                let rate = iterations as f64 / elapsed.as_secs_f64().max(1e-9);
                progress.update(
                    &bar_key(&driver, &scenario),
                    target,
                    elapsed,
                    format!("iters={iterations} iters/s={} errors={errors}", format_rate(rate)),
                );
            }
            ProgressEvent::ScenarioFinished(m) => {
                progress.finish_bar(
                    &bar_key(&m.driver, &m.operation),
                    format!(
                        "  {:<32} {:>14}  p50={} n={} errors={}",
                        m.operation,
                        format_throughput(&m),
                        format_latency(m.latency.p50),
                        m.iterations,
                        m.errors,
                    ),
                );
            }
            ProgressEvent::ScenarioFailed {
                driver,
                scenario,
                error,
            } => {
                progress.finish_bar(
                    &bar_key(&driver, &scenario),
                    format!("  {scenario:<32} failed: {error}"),
                );
            }
            ProgressEvent::Skipped(s) => {
                progress.println(format!("  {:<32} skipped: {}", s.operation, s.reason));
            }
        }))
    }

    fn print_summary(&self, outcome: &RunOutcome) -> anyhow::Result<()> {
        self.progress.finish();
        println!();
        print!("{}", summary::render(outcome));
        Ok(())
    }

    fn print_comparison(&self, comparisons: &[Comparison]) -> anyhow::Result<()> {
        println!();
        print!("{}", summary::render_comparison(comparisons));
        Ok(())
    }
}
