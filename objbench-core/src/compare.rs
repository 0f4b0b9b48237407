//! Baseline comparison between two reports.

use serde::Serialize;

use crate::report::Report;

/// Percentage change that counts as a regression or improvement.
pub const SIGNIFICANT_CHANGE_PCT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    #[strum(serialize = "regression")]
    Regression,
    #[strum(serialize = "improvement")]
    Improvement,
    #[strum(serialize = "unchanged")]
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub driver: String,
    pub operation: String,
    pub baseline_throughput: f64,
    pub current_throughput: f64,
    pub throughput_delta_pct: f64,
    pub p50_delta_pct: f64,
    pub p99_delta_pct: f64,
    pub verdict: Verdict,
}

fn delta_pct(baseline: f64, current: f64) -> f64 {
    if baseline == 0.0 {
        return 0.0;
    }
    (current - baseline) / baseline * 100.0
}

/// Matches results by (driver, operation). Entries missing from either side are ignored.
pub fn compare_reports(baseline: &Report, current: &Report) -> Vec<Comparison> {
    current
        .results
        .iter()
        .filter_map(|cur| {
            let base = baseline.find(&cur.driver, &cur.operation)?;

            let throughput_delta_pct = delta_pct(base.throughput, cur.throughput);
            let p50_delta_pct = delta_pct(
                base.latency.p50.as_secs_f64(),
                cur.latency.p50.as_secs_f64(),
            );
            let p99_delta_pct = delta_pct(
                base.latency.p99.as_secs_f64(),
                cur.latency.p99.as_secs_f64(),
            );

            let verdict = if throughput_delta_pct < -SIGNIFICANT_CHANGE_PCT
                || p99_delta_pct > SIGNIFICANT_CHANGE_PCT
            {
                Verdict::Regression
            } else if throughput_delta_pct > SIGNIFICANT_CHANGE_PCT
                || p99_delta_pct < -SIGNIFICANT_CHANGE_PCT
            {
                Verdict::Improvement
            } else {
                Verdict::Unchanged
            };

            Some(Comparison {
                driver: cur.driver.clone(),
                operation: cur.operation.clone(),
                baseline_throughput: base.throughput,
                current_throughput: cur.throughput,
                throughput_delta_pct,
                p50_delta_pct,
                p99_delta_pct,
                verdict,
            })
        })
        .collect()
}

pub fn has_regressions(comparisons: &[Comparison]) -> bool {
    comparisons.iter().any(|c| c.verdict == Verdict::Regression)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use objbench_metrics::{DurationStats, Metrics};

    use super::*;
    use crate::config::BenchConfig;

    fn metric(op: &str, throughput: f64, p99_ms: u64) -> Metrics {
        Metrics {
            operation: op.to_string(),
            driver: "mem".to_string(),
            object_size: 1024,
            iterations: 10,
            errors: 0,
            last_error: None,
            total_duration: Duration::from_secs(1),
            latency: DurationStats {
                samples: 10,
                p50: Duration::from_millis(p99_ms / 2),
                p99: Duration::from_millis(p99_ms),
                ..DurationStats::default()
            },
            ttfb: DurationStats::default(),
            throughput,
            ops_per_sec: 10.0,
            batch: 1,
            note: None,
        }
    }

    fn report(results: Vec<Metrics>) -> Report {
        let mut r = Report::new(BenchConfig::default());
        r.results = results;
        r
    }

    #[test]
    fn classifies_changes() {
        let base = report(vec![
            metric("Write/1KB", 100.0, 10),
            metric("Read/1KB", 100.0, 10),
            metric("Stat", 100.0, 10),
            metric("List/100", 100.0, 10),
        ]);
        let cur = report(vec![
            metric("Write/1KB", 80.0, 10),
            metric("Read/1KB", 100.0, 12),
            metric("Stat", 150.0, 10),
            metric("List/100", 105.0, 10),
            metric("Copy/1KB", 1.0, 1),
        ]);

        let cmp = compare_reports(&base, &cur);
        let verdicts: Vec<(&str, Verdict)> = cmp
            .iter()
            .map(|c| (c.operation.as_str(), c.verdict))
            .collect();
        assert_eq!(
            verdicts,
            vec![
                ("Write/1KB", Verdict::Regression),
                ("Read/1KB", Verdict::Regression),
                ("Stat", Verdict::Improvement),
                ("List/100", Verdict::Unchanged),
            ]
        );
        assert!(has_regressions(&cmp));
        assert!((cmp[0].throughput_delta_pct + 20.0).abs() < 1e-9);
    }

    #[test]
    fn zero_baseline_is_not_a_change() {
        let base = report(vec![metric("Stat", 0.0, 0)]);
        let cur = report(vec![metric("Stat", 50.0, 5)]);
        let cmp = compare_reports(&base, &cur);
        assert_eq!(cmp.len(), 1);
        assert_eq!(cmp[0].verdict, Verdict::Unchanged);
    }
}
