use crate::cli::OutputFormat;
use objbench_core::runner::{ProgressFn, RunOutcome};
use objbench_core::{BenchConfig, Comparison};

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, config: &BenchConfig);
    fn progress(&self) -> Option<ProgressFn>;
    fn print_summary(&self, outcome: &RunOutcome) -> anyhow::Result<()>;
    fn print_comparison(&self, comparisons: &[Comparison]) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
