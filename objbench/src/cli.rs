use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))?;

    match unit_str.trim() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(value))
        }
        "us" | "µs" | "usec" | "usecs" | "microsecond" | "microseconds" => {
            Ok(Duration::from_micros(value))
        }
        "m" | "min" | "mins" | "minute" | "minutes" => {
            let secs = value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        "h" | "hr" | "hrs" | "hour" | "hours" => {
            let secs = value
                .checked_mul(60)
                .and_then(|v| v.checked_mul(60))
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        _ => Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        )),
    }
}

fn parse_size(input: &str) -> Result<u64, String> {
    objbench_core::parse_size(input).map_err(|e| e.to_string())
}

fn parse_driver(input: &str) -> Result<objbench_core::DriverConfig, String> {
    objbench_core::DriverConfig::parse(input).map_err(|e| e.to_string())
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable progress and summary.
    HumanReadable,
    /// Emit JSON progress lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// raw_results.json
    Json,
    /// benchmark_report.md
    Markdown,
    /// benchmark_results.csv
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "objbench",
    author,
    version,
    about = "Adaptive benchmarks for object-storage backends",
    long_about = "objbench measures object-storage backends with an adaptive iteration loop.\n\nEvery scenario runs until its measured time reaches the configured bench time. Backends are selected by DSN (`memory://`, `devnull://`, `file:///path`).",
    after_help = "Examples:\n  objbench run --driver mem=memory:// --quick\n  objbench run --driver local=file:///tmp/bench --sizes 1KB,1MB --bench-time 2s\n  objbench run --config bench.yaml --output json --out-dir results\n  objbench compare baseline/raw_results.json results/raw_results.json"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Benchmark one or more storage backends
    #[command(
        long_about = "Run the scenario suite against every configured backend.\n\nCLI flags override values from the YAML config file."
    )]
    Run(RunArgs),

    /// Compare two raw_results.json reports
    Compare(CompareArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// YAML config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Backend to benchmark (repeatable, NAME=DSN)
    #[arg(long = "driver", value_name = "NAME=DSN", value_parser = parse_driver)]
    pub drivers: Vec<objbench_core::DriverConfig>,

    /// Bucket used on every backend
    #[arg(long)]
    pub bucket: Option<String>,

    /// Target measured time per scenario (e.g. 1s, 500ms)
    #[arg(long, value_parser = parse_duration)]
    pub bench_time: Option<Duration>,

    #[arg(long)]
    pub min_iterations: Option<u64>,

    #[arg(long)]
    pub max_iterations: Option<u64>,

    /// Untimed warm-up operations per scenario
    #[arg(long)]
    pub warmup: Option<u64>,

    /// Workers for mixed workloads
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Parallel scenario levels (e.g. 1,10,25)
    #[arg(long, value_delimiter = ',')]
    pub concurrency_levels: Option<Vec<usize>>,

    /// Object sizes (e.g. 1KB,64KB,1MB)
    #[arg(long, value_delimiter = ',', value_parser = parse_size)]
    pub sizes: Option<Vec<u64>>,

    /// Per-operation timeout (0 disables)
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Overall timeout for one parallel scenario
    #[arg(long, value_parser = parse_duration)]
    pub parallel_timeout: Option<Duration>,

    /// File counts for the scaling scenarios (e.g. 10,100,1000)
    #[arg(long, value_delimiter = ',')]
    pub file_counts: Option<Vec<u64>>,

    /// Only run scenarios whose label contains this text
    #[arg(long)]
    pub filter: Option<String>,

    /// Short run: smaller sizes, fewer levels, 200ms bench time
    #[arg(long)]
    pub quick: bool,

    /// Delete every object in the bucket after each backend
    #[arg(long)]
    pub cleanup: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,

    /// Directory for report files
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Report files to write into --out-dir
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [ReportFormat::Json, ReportFormat::Markdown, ReportFormat::Csv])]
    pub formats: Vec<ReportFormat>,

    /// Previous raw_results.json to compare against
    #[arg(long, value_name = "FILE")]
    pub baseline: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Baseline raw_results.json
    pub baseline: PathBuf,

    /// Current raw_results.json
    pub current: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_common_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(2 * 60 * 60)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
    }

    #[test]
    fn cli_parses_run_overrides() {
        let parsed = Cli::try_parse_from([
            "objbench",
            "run",
            "--driver",
            "mem=memory://",
            "--driver",
            "file:///tmp/bench",
            "--bench-time",
            "250ms",
            "--sizes",
            "1KB,64KiB",
            "--concurrency-levels",
            "1,4",
            "--formats",
            "json,csv",
            "-vv",
        ]);

        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };
        assert_eq!(cli.verbose, 2);

        match cli.command {
            Command::Run(args) => {
                let names: Vec<&str> = args.drivers.iter().map(|d| d.name.as_str()).collect();
                assert_eq!(names, vec!["mem", "file"]);
                assert_eq!(args.bench_time, Some(Duration::from_millis(250)));
                assert_eq!(args.sizes, Some(vec![1024, 64 * 1024]));
                assert_eq!(args.concurrency_levels, Some(vec![1, 4]));
                assert_eq!(args.formats, vec![ReportFormat::Json, ReportFormat::Csv]);
                assert!(matches!(args.output, OutputFormat::HumanReadable));
                assert!(!args.quick);
            }
            Command::Compare(_) => panic!("expected run command"),
        }
    }

    #[test]
    fn cli_rejects_malformed_driver() {
        assert!(Cli::try_parse_from(["objbench", "run", "--driver", "nodsn"]).is_err());
    }

    #[test]
    fn cli_parses_compare() {
        let parsed = Cli::try_parse_from(["objbench", "compare", "a.json", "b.json"]);
        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };
        match cli.command {
            Command::Compare(args) => {
                assert_eq!(args.baseline, PathBuf::from("a.json"));
                assert_eq!(args.current, PathBuf::from("b.json"));
            }
            Command::Run(_) => panic!("expected compare command"),
        }
    }
}
