use objbench_core::{compare_reports, has_regressions};

use crate::cli::CompareArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::report_files::load_report;
use crate::run_error::RunError;

/// Compares two saved reports and exits non-zero when anything regressed.
pub async fn compare(args: CompareArgs) -> Result<ExitCode, RunError> {
    let baseline = load_report(&args.baseline)
        .await
        .map_err(RunError::InvalidInput)?;
    let current = load_report(&args.current)
        .await
        .map_err(RunError::InvalidInput)?;

    let comparisons = compare_reports(&baseline, &current);
    output::formatter(args.output)
        .print_comparison(&comparisons)
        .map_err(RunError::RuntimeError)?;

    Ok(ExitCode::from_outcome(false, has_regressions(&comparisons)))
}
