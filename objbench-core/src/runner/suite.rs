//! The fixed per-backend scenario order.

use std::time::Duration;

use strum::IntoEnumIterator as _;

use super::execute::Plan;
use super::scenario::{EdgeCase, Scenario, ScenarioKind};
use crate::config::{BenchConfig, DriverConfig};
use crate::report::SkippedBenchmark;
use crate::size::{KB, MB};

pub(crate) const LIST_OBJECTS: usize = 100;
pub(crate) const RANGE_OBJECT_SIZE: u64 = MB;
pub(crate) const MIXED_OBJECT_SIZE: u64 = 16 * KB;

/// File counts above this need a generous timeout to finish.
pub(crate) const FILE_COUNT_LONG_RUN: u64 = 10_000;
pub(crate) const FILE_COUNT_MIN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const RANGES: [(&str, u64, u64); 3] = [
    ("Start", 0, 256 * KB),
    ("Middle", 512 * KB, 256 * KB),
    ("End", 768 * KB, 256 * KB),
];

const MIXES: [(&str, u64); 3] = [
    ("ReadHeavy_90_10", 90),
    ("Balanced_50_50", 50),
    ("WriteHeavy_10_90", 10),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SuiteEntry {
    Run(Scenario),
    Skip(SkippedBenchmark),
}

/// Every scenario for one backend, in run order.
pub(crate) fn plan_suite(cfg: &BenchConfig, driver: &DriverConfig) -> Vec<SuiteEntry> {
    let mut out = Vec::new();
    let first = cfg.object_sizes.first().copied().unwrap_or(KB);

    let mut push = |out: &mut Vec<SuiteEntry>, s: Scenario| {
        if cfg.matches_filter(&s.label) {
            out.push(SuiteEntry::Run(s));
        }
    };

    for &size in &cfg.object_sizes {
        push(&mut out, Scenario::write(size));
    }
    for &size in &cfg.object_sizes {
        push(&mut out, Scenario::read(size));
    }
    push(&mut out, Scenario::stat());
    push(&mut out, Scenario::list(LIST_OBJECTS));
    push(&mut out, Scenario::delete());

    for &c in &cfg.concurrency_levels {
        let pair = [Scenario::parallel_write(first, c), Scenario::parallel_read(first, c)];
        if driver.supports_concurrency(c) {
            for s in pair {
                push(&mut out, s);
            }
        } else {
            let max = driver.max_concurrency.unwrap_or_default();
            for s in pair {
                out.push(SuiteEntry::Skip(SkippedBenchmark::new(
                    &driver.name,
                    s.label,
                    format!("concurrency {c} exceeds backend max concurrency {max}"),
                )));
            }
        }
    }

    for (name, offset, length) in RANGES {
        push(&mut out, Scenario::range_read(name, offset, length));
    }
    push(&mut out, Scenario::copy(first));

    let workers = driver
        .max_concurrency
        .map_or(cfg.concurrency, |max| cfg.concurrency.min(max.max(1)));
    for (name, read_percent) in MIXES {
        push(
            &mut out,
            Scenario::mixed(name, read_percent, MIXED_OBJECT_SIZE, workers),
        );
    }

    push(
        &mut out,
        Scenario::multipart(cfg.multipart_part_size, cfg.multipart_parts),
    );

    for case in EdgeCase::iter() {
        push(&mut out, Scenario::edge_case(case));
    }

    for &files in &cfg.file_counts {
        let s = Scenario::file_count(files);
        if files > FILE_COUNT_LONG_RUN && cfg.timeout < FILE_COUNT_MIN_TIMEOUT {
            out.push(SuiteEntry::Skip(SkippedBenchmark::new(
                &driver.name,
                s.label,
                "requires longer timeout",
            )));
            continue;
        }
        let wanted = s.result_labels().iter().any(|l| cfg.matches_filter(l))
            || cfg.matches_filter(&s.label);
        if wanted {
            out.push(SuiteEntry::Run(s));
        }
    }

    out
}

/// Adaptive plan for one scenario.
pub(crate) fn plan_for(cfg: &BenchConfig, scenario: &Scenario) -> Plan {
    let size = scenario.size();
    let mut plan = Plan {
        bench_time: cfg.bench_time_for_size(size),
        min_iterations: cfg.min_bench_iterations,
        max_iterations: cfg.max_bench_iterations,
        warmup: cfg.warmup_for_size(size),
        op_timeout: cfg.timeout_for_size(size),
        workers: scenario.concurrency.unwrap_or(1).max(1),
        deadline: None,
    };

    match scenario.kind {
        ScenarioKind::ParallelWrite | ScenarioKind::ParallelRead | ScenarioKind::Mixed { .. } => {
            plan.deadline = cfg.parallel_timeout();
        }
        ScenarioKind::Multipart { .. } => {
            plan.max_iterations = (cfg.max_bench_iterations / 5).max(2);
            plan.min_iterations = plan.min_iterations.min(plan.max_iterations);
            plan.warmup = plan.warmup.min(1);
        }
        _ => {}
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(entries: &[SuiteEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| match e {
                SuiteEntry::Run(s) => s.label.clone(),
                SuiteEntry::Skip(s) => format!("skip:{}", s.operation),
            })
            .collect()
    }

    fn small_config() -> BenchConfig {
        BenchConfig {
            object_sizes: vec![KB],
            concurrency_levels: vec![1, 5],
            file_counts: vec![10],
            ..BenchConfig::default()
        }
    }

    #[test]
    fn suite_runs_in_fixed_order() {
        let cfg = small_config();
        let driver = DriverConfig::new("mem", "memory://");
        assert_eq!(
            labels(&plan_suite(&cfg, &driver)),
            vec![
                "Write/1KB",
                "Read/1KB",
                "Stat",
                "List/100",
                "Delete",
                "ParallelWrite/1KB/C1",
                "ParallelRead/1KB/C1",
                "ParallelWrite/1KB/C5",
                "ParallelRead/1KB/C5",
                "RangeRead/Start_256KB",
                "RangeRead/Middle_256KB",
                "RangeRead/End_256KB",
                "Copy/1KB",
                "MixedWorkload/ReadHeavy_90_10",
                "MixedWorkload/Balanced_50_50",
                "MixedWorkload/WriteHeavy_10_90",
                "Multipart/15MB_3Parts",
                "EdgeCase/EmptyObject",
                "EdgeCase/LongKey256",
                "EdgeCase/DeepNested",
                "FileCount/10",
            ]
        );
    }

    #[test]
    fn concurrency_above_backend_max_is_skipped() {
        let cfg = small_config();
        let driver = DriverConfig::new("slow", "memory://").with_max_concurrency(2);
        let entries = plan_suite(&cfg, &driver);

        let skips: Vec<&SkippedBenchmark> = entries
            .iter()
            .filter_map(|e| match e {
                SuiteEntry::Skip(s) => Some(s),
                SuiteEntry::Run(_) => None,
            })
            .collect();
        assert_eq!(skips.len(), 2);
        assert_eq!(skips[0].operation, "ParallelWrite/1KB/C5");
        assert_eq!(skips[1].operation, "ParallelRead/1KB/C5");
        assert!(skips[0].reason.contains("max concurrency 2"));

        let mixed = entries.iter().find_map(|e| match e {
            SuiteEntry::Run(s) if s.label.starts_with("MixedWorkload/") => s.concurrency,
            _ => None,
        });
        assert_eq!(mixed, Some(2));
    }

    #[test]
    fn filter_applies_after_gating() {
        let cfg = BenchConfig {
            filter: Some("Stat".into()),
            ..small_config()
        };
        let driver = DriverConfig::new("slow", "memory://").with_max_concurrency(2);
        assert_eq!(
            labels(&plan_suite(&cfg, &driver)),
            vec![
                "Stat",
                "skip:ParallelWrite/1KB/C5",
                "skip:ParallelRead/1KB/C5"
            ]
        );
    }

    #[test]
    fn file_count_filter_matches_phase_labels() {
        let cfg = BenchConfig {
            filter: Some("FileCount/List".into()),
            ..small_config()
        };
        let driver = DriverConfig::new("mem", "memory://");
        assert_eq!(labels(&plan_suite(&cfg, &driver)), vec!["FileCount/10"]);
    }

    #[test]
    fn huge_file_counts_need_a_long_timeout() {
        let mut cfg = BenchConfig {
            file_counts: vec![20_000],
            filter: Some("FileCount".into()),
            ..small_config()
        };
        let driver = DriverConfig::new("mem", "memory://");
        assert_eq!(
            labels(&plan_suite(&cfg, &driver)),
            vec!["skip:FileCount/20000"]
        );

        cfg.timeout = Duration::from_secs(10 * 60);
        assert_eq!(labels(&plan_suite(&cfg, &driver)), vec!["FileCount/20000"]);
    }

    #[test]
    fn multipart_plan_is_scaled_down() {
        let cfg = BenchConfig {
            min_bench_iterations: 3,
            max_bench_iterations: 5,
            ..BenchConfig::default()
        };
        let plan = plan_for(&cfg, &Scenario::multipart(5 * MB, 3));
        assert_eq!(plan.max_iterations, 2);
        assert_eq!(plan.min_iterations, 2);

        let plan = plan_for(&cfg, &Scenario::parallel_write(KB, 10));
        assert_eq!(plan.workers, 10);
        assert_eq!(plan.deadline, Some(cfg.timeout));
    }
}
