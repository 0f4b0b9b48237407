use objbench_core::runner::Runner;
use objbench_core::storage::Registry;
use objbench_core::{BenchConfig, Report, compare_reports, has_regressions};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::config_yaml::load_bench_yaml;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::report_files::{load_report, write_comparison, write_reports};
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let config = build_config(&args).await.map_err(RunError::InvalidInput)?;
    config.validate().map_err(RunError::from_core)?;

    // Load the baseline first so a bad path fails before the benchmark runs.
    let baseline: Option<Report> = match &args.baseline {
        Some(path) => Some(load_report(path).await.map_err(RunError::InvalidInput)?),
        None => None,
    };

    let out = output::formatter(args.output);
    out.print_header(&config);

    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    let mut runner = Runner::new(config, Registry::with_defaults());
    if let Some(progress) = out.progress() {
        runner = runner.with_progress(progress);
    }

    let outcome = runner.run(cancel).await.map_err(RunError::from_core)?;
    out.print_summary(&outcome).map_err(RunError::RuntimeError)?;

    if let Some(dir) = &args.out_dir {
        let written = write_reports(&outcome.report, dir, &args.formats)
            .await
            .map_err(RunError::RuntimeError)?;
        for path in &written {
            info!(path = %path.display(), "report written");
        }
    }

    let mut regressions = false;
    if let Some(baseline) = baseline {
        let comparisons = compare_reports(&baseline, &outcome.report);
        regressions = has_regressions(&comparisons);
        out.print_comparison(&comparisons)
            .map_err(RunError::RuntimeError)?;
        if let Some(dir) = &args.out_dir {
            write_comparison(dir, &comparisons)
                .await
                .map_err(RunError::RuntimeError)?;
        }
    }

    Ok(ExitCode::from_outcome(outcome.cancelled, regressions))
}

fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(err) = res {
                    warn!("failed to listen for ctrl-c: {err}");
                    return;
                }
                warn!("interrupt received, cancelling run");
                cancel.cancel();
            }
            () = cancel.cancelled() => {}
        }
    });
}

/// Defaults, then the YAML file, then `--quick`, then explicit flags.
async fn build_config(args: &RunArgs) -> anyhow::Result<BenchConfig> {
    let mut cfg = BenchConfig::default();

    if let Some(path) = &args.config {
        load_bench_yaml(path).await?.apply(&mut cfg)?;
    }

    if args.quick {
        cfg = cfg.quick();
    }

    if !args.drivers.is_empty() {
        cfg.drivers.clone_from(&args.drivers);
    }
    if let Some(bucket) = &args.bucket {
        for d in &mut cfg.drivers {
            d.bucket.clone_from(bucket);
        }
    }
    if let Some(v) = args.bench_time {
        cfg.bench_time = v;
    }
    if let Some(v) = args.min_iterations {
        cfg.min_bench_iterations = v;
    }
    if let Some(v) = args.max_iterations {
        cfg.max_bench_iterations = v;
    }
    if let Some(v) = args.warmup {
        cfg.warmup_iterations = v;
    }
    if let Some(v) = args.concurrency {
        cfg.concurrency = v;
    }
    if let Some(v) = &args.concurrency_levels {
        cfg.concurrency_levels.clone_from(v);
    }
    if let Some(v) = &args.sizes {
        cfg.object_sizes.clone_from(v);
    }
    if let Some(v) = args.timeout {
        cfg.timeout = v;
    }
    if let Some(v) = args.parallel_timeout {
        cfg.parallel_timeout = Some(v);
    }
    if let Some(v) = &args.file_counts {
        cfg.file_counts.clone_from(v);
    }
    if args.filter.is_some() {
        cfg.filter.clone_from(&args.filter);
    }
    if args.cleanup {
        cfg.cleanup = true;
    }

    Ok(cfg)
}
