use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use objbench_core::{Comparison, Metrics, Report, Verdict};

use crate::cli::ReportFormat;

pub(crate) const JSON_FILE: &str = "raw_results.json";
pub(crate) const MARKDOWN_FILE: &str = "benchmark_report.md";
pub(crate) const CSV_FILE: &str = "benchmark_results.csv";
pub(crate) const COMPARISON_FILE: &str = "comparison.md";

const CSV_HEADER: &str = "driver,operation,object_size,iterations,throughput_mbps,ops_per_sec,avg_latency_ms,p50_ms,p95_ms,p99_ms,ttfb_avg_ms,ttfb_p50_ms,ttfb_p95_ms,ttfb_p99_ms,errors";

pub(crate) fn format_latency(d: Duration) -> String {
    if d < Duration::from_micros(1) {
        return format!("{}ns", d.as_nanos());
    }
    if d < Duration::from_millis(1) {
        return format!("{:.1}us", d.as_nanos() as f64 / 1_000.0);
    }
    if d < Duration::from_secs(1) {
        return format!("{:.1}ms", d.as_nanos() as f64 / 1_000_000.0);
    }
    format!("{:.2}s", d.as_secs_f64())
}

pub(crate) fn format_throughput(m: &Metrics) -> String {
    if m.object_size > 0 {
        format!("{:.2} MB/s", m.throughput)
    } else {
        format!("{:.0} ops/s", m.throughput)
    }
}

fn ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub(crate) fn render_csv(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(CSV_HEADER);
    out.push('\n');

    for m in &report.results {
        writeln!(
            out,
            "{},{},{},{},{:.4},{:.2},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{}",
            csv_field(&m.driver),
            csv_field(&m.operation),
            m.object_size,
            m.iterations,
            m.throughput,
            m.ops_per_sec,
            ms(m.latency.avg),
            ms(m.latency.p50),
            ms(m.latency.p95),
            ms(m.latency.p99),
            ms(m.ttfb.avg),
            ms(m.ttfb.p50),
            ms(m.ttfb.p95),
            ms(m.ttfb.p99),
            m.errors,
        )
        .ok();
    }

    out
}

pub(crate) fn render_markdown(report: &Report) -> String {
    let mut out = String::new();
    let cfg = &report.config;

    out.push_str("# Storage Benchmark Report\n\n");
    writeln!(out, "**Generated:** {}\n", report.timestamp.to_rfc3339()).ok();

    out.push_str("## Configuration\n\n");
    out.push_str("| Parameter | Value |\n");
    out.push_str("|-----------|-------|\n");
    writeln!(out, "| Bench time | {} |", humantime::format_duration(cfg.bench_time)).ok();
    writeln!(
        out,
        "| Iterations | {} - {} |",
        cfg.min_bench_iterations, cfg.max_bench_iterations
    )
    .ok();
    writeln!(out, "| Warmup | {} |", cfg.warmup_iterations).ok();
    writeln!(out, "| Concurrency | {} |", cfg.concurrency).ok();
    writeln!(out, "| Timeout | {} |", humantime::format_duration(cfg.timeout)).ok();
    out.push('\n');

    let mut by_driver: BTreeMap<&str, usize> = BTreeMap::new();
    let mut by_operation: BTreeMap<&str, Vec<&Metrics>> = BTreeMap::new();
    for m in &report.results {
        *by_driver.entry(m.driver.as_str()).or_default() += 1;
        by_operation.entry(m.operation.as_str()).or_default().push(m);
    }

    out.push_str("## Drivers Tested\n\n");
    for (driver, count) in &by_driver {
        writeln!(out, "- **{driver}** ({count} benchmarks)").ok();
    }
    out.push('\n');

    out.push_str("## Detailed Results\n\n");
    for (op, mut results) in by_operation {
        writeln!(out, "### {op}\n").ok();

        let has_ttfb = op.contains("Read") && results.first().is_some_and(|m| !m.ttfb.avg.is_zero());
        if has_ttfb {
            out.push_str("| Driver | Throughput | TTFB Avg | TTFB P95 | P50 | P95 | P99 | Errors |\n");
            out.push_str("|--------|------------|----------|----------|-----|-----|-----|--------|\n");
        } else {
            out.push_str("| Driver | Throughput | P50 | P95 | P99 | Errors |\n");
            out.push_str("|--------|------------|-----|-----|-----|--------|\n");
        }

        results.sort_by(|a, b| b.throughput.total_cmp(&a.throughput));
        for m in results {
            if has_ttfb {
                writeln!(
                    out,
                    "| {} | {} | {} | {} | {} | {} | {} | {} |",
                    m.driver,
                    format_throughput(m),
                    format_latency(m.ttfb.avg),
                    format_latency(m.ttfb.p95),
                    format_latency(m.latency.p50),
                    format_latency(m.latency.p95),
                    format_latency(m.latency.p99),
                    m.errors,
                )
                .ok();
            } else {
                writeln!(
                    out,
                    "| {} | {} | {} | {} | {} | {} |",
                    m.driver,
                    format_throughput(m),
                    format_latency(m.latency.p50),
                    format_latency(m.latency.p95),
                    format_latency(m.latency.p99),
                    m.errors,
                )
                .ok();
            }
        }
        out.push('\n');
    }

    if !report.skipped.is_empty() {
        out.push_str("## Skipped\n\n");
        out.push_str("| Driver | Operation | Reason |\n");
        out.push_str("|--------|-----------|--------|\n");
        for s in &report.skipped {
            writeln!(out, "| {} | {} | {} |", s.driver, s.operation, s.reason).ok();
        }
        out.push('\n');
    }

    if !report.resource_usage.is_empty() {
        out.push_str("## Resource Usage\n\n");
        out.push_str("| Driver | CPU | Memory | Disk | Note |\n");
        out.push_str("|--------|-----|--------|------|------|\n");
        for (driver, u) in &report.resource_usage {
            let cpu = u.cpu_percent.map_or_else(|| "-".to_string(), |v| format!("{v:.1}%"));
            let mem = u.memory_bytes.map_or_else(|| "-".to_string(), objbench_core::size_label);
            let disk = u.disk_bytes.map_or_else(|| "-".to_string(), objbench_core::size_label);
            let note = u.note.as_deref().unwrap_or("-");
            writeln!(out, "| {driver} | {cpu} | {mem} | {disk} | {note} |").ok();
        }
        out.push('\n');
    }

    let write_best = best_for(report, "Write");
    let read_best = best_for(report, "Read");
    if write_best.is_some() || read_best.is_some() {
        out.push_str("## Recommendations\n\n");
        if let Some(d) = write_best {
            writeln!(out, "- **Write-heavy workloads:** {d}").ok();
        }
        if let Some(d) = read_best {
            writeln!(out, "- **Read-heavy workloads:** {d}").ok();
        }
        out.push('\n');
    }

    out
}

fn best_for<'a>(report: &'a Report, prefix: &str) -> Option<&'a str> {
    report
        .results
        .iter()
        .filter(|m| m.operation.starts_with(prefix) && m.throughput > 0.0)
        .max_by(|a, b| a.throughput.total_cmp(&b.throughput))
        .map(|m| m.driver.as_str())
}

pub(crate) fn render_comparison(comparisons: &[Comparison]) -> String {
    let mut out = String::new();
    out.push_str("## Performance Comparison vs Baseline\n\n");

    let regressions: Vec<&Comparison> = comparisons
        .iter()
        .filter(|c| c.verdict == Verdict::Regression)
        .collect();
    let improvements: Vec<&Comparison> = comparisons
        .iter()
        .filter(|c| c.verdict == Verdict::Improvement)
        .collect();

    out.push_str("### Summary\n\n");
    writeln!(out, "- **Total comparisons:** {}", comparisons.len()).ok();
    writeln!(out, "- **Regressions detected:** {}", regressions.len()).ok();
    writeln!(out, "- **Improvements detected:** {}", improvements.len()).ok();
    out.push('\n');

    for (title, rows) in [
        ("### Regressions (>10% slower)", &regressions),
        ("### Improvements (>10% faster)", &improvements),
    ] {
        if rows.is_empty() {
            continue;
        }
        writeln!(out, "{title}\n").ok();
        out.push_str("| Driver | Operation | Baseline | Current | Throughput Δ | P99 Δ |\n");
        out.push_str("|--------|-----------|----------|---------|--------------|-------|\n");
        for c in rows {
            writeln!(
                out,
                "| {} | {} | {:.2} | {:.2} | {:+.1}% | {:+.1}% |",
                c.driver,
                c.operation,
                c.baseline_throughput,
                c.current_throughput,
                c.throughput_delta_pct,
                c.p99_delta_pct,
            )
            .ok();
        }
        out.push('\n');
    }

    out.push_str("### Full Comparison\n\n");
    out.push_str("| Driver | Operation | Baseline | Current | Throughput Δ | Status |\n");
    out.push_str("|--------|-----------|----------|---------|--------------|--------|\n");
    for c in comparisons {
        let status = match c.verdict {
            Verdict::Regression => "REGRESSION",
            Verdict::Improvement => "IMPROVED",
            Verdict::Unchanged => "STABLE",
        };
        writeln!(
            out,
            "| {} | {} | {:.2} | {:.2} | {:+.1}% | {status} |",
            c.driver, c.operation, c.baseline_throughput, c.current_throughput, c.throughput_delta_pct,
        )
        .ok();
    }
    out.push('\n');

    out
}

/// Writes the selected report files into `dir`, creating it if needed.
pub(crate) async fn write_reports(
    report: &Report,
    dir: &Path,
    formats: &[ReportFormat],
) -> anyhow::Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create output dir: {}", dir.display()))?;

    let mut written = Vec::with_capacity(formats.len());
    for format in formats {
        let (name, body) = match format {
            ReportFormat::Json => (
                JSON_FILE,
                serde_json::to_string_pretty(report).context("failed to serialize report")?,
            ),
            ReportFormat::Markdown => (MARKDOWN_FILE, render_markdown(report)),
            ReportFormat::Csv => (CSV_FILE, render_csv(report)),
        };
        let path = dir.join(name);
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }

    Ok(written)
}

pub(crate) async fn write_comparison(dir: &Path, comparisons: &[Comparison]) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create output dir: {}", dir.display()))?;
    let path = dir.join(COMPARISON_FILE);
    tokio::fs::write(&path, render_comparison(comparisons))
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

pub(crate) async fn load_report(path: &Path) -> anyhow::Result<Report> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read report: {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse report JSON: {}", path.display()))
}
