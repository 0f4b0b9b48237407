use std::io::Write as _;
use std::sync::Arc;

use objbench_core::runner::{ProgressEvent, ProgressFn, RunOutcome};
use objbench_core::{BenchConfig, Comparison, Metrics, SkippedBenchmark, has_regressions};
use serde::Serialize;

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _config: &BenchConfig) {}

    fn progress(&self) -> Option<ProgressFn> {
        Some(Arc::new(move |ev: ProgressEvent| {
            emit_json_line(&build_progress_line(&ev));
        }))
    }

    fn print_summary(&self, outcome: &RunOutcome) -> anyhow::Result<()> {
        let report = &outcome.report;
        let line = JsonSummaryLine {
            kind: "summary",
            cancelled: outcome.cancelled,
            timestamp: report.timestamp.to_rfc3339(),
            drivers: report.drivers(),
            total_errors: report.total_errors(),
            results: &report.results,
            skipped: &report.skipped,
        };
        emit_json_line(&line);
        Ok(())
    }

    fn print_comparison(&self, comparisons: &[Comparison]) -> anyhow::Result<()> {
        let line = JsonComparisonLine {
            kind: "comparison",
            regressions: has_regressions(comparisons),
            comparisons,
        };
        emit_json_line(&line);
        Ok(())
    }
}

/// One NDJSON progress record. Fields not relevant to an event are omitted.
#[derive(Debug, Default, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Metrics>,
}

fn build_progress_line(ev: &ProgressEvent) -> JsonProgressLine {
    match ev {
        ProgressEvent::State(state) => JsonProgressLine {
            kind: "state",
            state: Some(state.to_string()),
            ..Default::default()
        },
        ProgressEvent::BackendDetected {
            driver,
            available,
            reason,
        } => JsonProgressLine {
            kind: "backend_detected",
            driver: Some(driver.clone()),
            available: Some(*available),
            reason: reason.clone(),
            ..Default::default()
        },
        ProgressEvent::BackendStarted {
            driver,
            index,
            total,
        } => JsonProgressLine {
            kind: "backend_started",
            driver: Some(driver.clone()),
            index: Some(*index),
            total: Some(*total),
            ..Default::default()
        },
        ProgressEvent::BackendFinished { driver } => JsonProgressLine {
            kind: "backend_finished",
            driver: Some(driver.clone()),
            ..Default::default()
        },
        ProgressEvent::ScenarioStarted {
            driver,
            scenario,
            target,
        } => JsonProgressLine {
            kind: "scenario_started",
            driver: Some(driver.clone()),
            scenario: Some(scenario.clone()),
            target_secs: Some(target.as_secs_f64()),
            ..Default::default()
        },
        ProgressEvent::RoundCompleted {
            driver,
            scenario,
            iterations,
            errors,
            elapsed,
            target,
        } => JsonProgressLine {
            kind: "progress",
            driver: Some(driver.clone()),
            scenario: Some(scenario.clone()),
            iterations: Some(*iterations),
            errors: Some(*errors),
            elapsed_secs: Some(elapsed.as_secs_f64()),
            target_secs: Some(target.as_secs_f64()),
            ..Default::default()
        },
        ProgressEvent::ScenarioFinished(m) => JsonProgressLine {
            kind: "result",
            driver: Some(m.driver.clone()),
            scenario: Some(m.operation.clone()),
            result: Some(m.clone()),
            ..Default::default()
        },
        ProgressEvent::ScenarioFailed {
            driver,
            scenario,
            error,
        } => JsonProgressLine {
            kind: "scenario_failed",
            driver: Some(driver.clone()),
            scenario: Some(scenario.clone()),
            error: Some(error.clone()),
            ..Default::default()
        },
        ProgressEvent::Skipped(s) => JsonProgressLine {
            kind: "skipped",
            driver: Some(s.driver.clone()),
            scenario: Some(s.operation.clone()),
            reason: Some(s.reason.clone()),
            ..Default::default()
        },
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine<'a> {
    pub kind: &'static str,
    pub cancelled: bool,
    pub timestamp: String,
    pub drivers: Vec<&'a str>,
    pub total_errors: u64,
    pub results: &'a [Metrics],
    pub skipped: &'a [SkippedBenchmark],
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonComparisonLine<'a> {
    pub kind: &'static str,
    pub regressions: bool,
    pub comparisons: &'a [Comparison],
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
