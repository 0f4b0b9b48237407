use std::collections::BTreeMap;
use std::fmt::Write as _;

use objbench_core::{Comparison, Verdict};
use objbench_core::runner::RunOutcome;

use super::format::{format_bytes, format_rate};
use crate::report_files::{format_latency, format_throughput};

pub(crate) fn render(outcome: &RunOutcome) -> String {
    let report = &outcome.report;
    let mut out = String::new();

    if report.results.is_empty() && report.skipped.is_empty() {
        out.push_str("summary: no results\n");
        if outcome.cancelled {
            out.push_str("run cancelled\n");
        }
        return out;
    }

    out.push_str("summary\n");

    let mut bytes_by_driver: BTreeMap<&str, u64> = BTreeMap::new();
    for driver in report.drivers() {
        writeln!(&mut out, "driver: {driver}").ok();
        for m in report.results.iter().filter(|m| m.driver == driver) {
            let moved = m
                .object_size
                .saturating_mul(m.iterations)
                .saturating_mul(m.batch.max(1));
            *bytes_by_driver.entry(driver).or_default() += moved;

            writeln!(
                &mut out,
                "  {:<32} {:>14}  ops/s={:<8} p50={:<9} p99={:<9} n={} errors={}",
                m.operation,
                format_throughput(m),
                format_rate(m.ops_per_sec),
                format_latency(m.latency.p50),
                format_latency(m.latency.p99),
                m.iterations,
                m.errors,
            )
            .ok();
            if let Some(err) = &m.last_error {
                writeln!(&mut out, "    last error: {err}").ok();
            }
            if let Some(note) = &m.note {
                writeln!(&mut out, "    note: {note}").ok();
            }
        }
        out.push('\n');
    }

    if !report.skipped.is_empty() {
        out.push_str("skipped\n");
        for s in &report.skipped {
            writeln!(&mut out, "  {} {}: {}", s.driver, s.operation, s.reason).ok();
        }
        out.push('\n');
    }

    out.push_str("totals\n");
    writeln!(&mut out, "  results: {}", report.results.len()).ok();
    writeln!(&mut out, "  errors: {}", report.total_errors()).ok();
    for (driver, bytes) in &bytes_by_driver {
        writeln!(&mut out, "  bytes moved ({driver}): {}", format_bytes(*bytes)).ok();
    }
    if outcome.cancelled {
        out.push_str("  run cancelled: partial results\n");
    }

    out
}

pub(crate) fn render_comparison(comparisons: &[Comparison]) -> String {
    let mut out = String::new();
    if comparisons.is_empty() {
        out.push_str("comparison: no matching results in baseline\n");
        return out;
    }

    out.push_str("comparison vs baseline\n");
    for c in comparisons {
        let marker = match c.verdict {
            Verdict::Regression => "REGRESSION",
            Verdict::Improvement => "improved",
            Verdict::Unchanged => "stable",
        };
        writeln!(
            &mut out,
            "  {:<12} {:<32} throughput {:+.1}%  p99 {:+.1}%  {marker}",
            c.driver, c.operation, c.throughput_delta_pct, c.p99_delta_pct
        )
        .ok();
    }

    let regressions = comparisons
        .iter()
        .filter(|c| c.verdict == Verdict::Regression)
        .count();
    writeln!(&mut out, "  regressions: {regressions}/{}", comparisons.len()).ok();

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use objbench_core::{BenchConfig, Report, SkippedBenchmark};

    #[test]
    fn empty_report_says_so() {
        let outcome = RunOutcome {
            report: Report::new(BenchConfig::default()),
            cancelled: true,
        };
        let s = render(&outcome);
        assert!(s.contains("no results"));
        assert!(s.contains("cancelled"));
    }

    #[test]
    fn skipped_entries_are_listed() {
        let mut report = Report::new(BenchConfig::default());
        report
            .skipped
            .push(SkippedBenchmark::new("mem", "ParallelWrite/1KB/C50", "too much"));
        let s = render(&RunOutcome {
            report,
            cancelled: false,
        });
        assert!(s.contains("mem ParallelWrite/1KB/C50: too much"));
        assert!(s.contains("results: 0"));
    }
}
