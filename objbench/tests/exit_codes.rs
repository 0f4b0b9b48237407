use std::path::Path;
use std::process::{Command, Output};

use anyhow::Context as _;

fn status_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn ensure_code(out: &Output, expected: i32) -> anyhow::Result<()> {
    anyhow::ensure!(
        status_code(out.status) == expected,
        "expected exit code {expected}, got {}\nstdout:\n{}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(())
}

/// Runs the `Stat` scenario against the in-memory backend and writes reports into `dir`.
fn quick_memory_run(dir: &Path, extra: &[&str]) -> anyhow::Result<Output> {
    let exe = env!("CARGO_BIN_EXE_objbench");
    Command::new(exe)
        .arg("run")
        .arg("--driver")
        .arg("mem=memory://")
        .arg("--bench-time")
        .arg("20ms")
        .arg("--warmup")
        .arg("0")
        .arg("--sizes")
        .arg("1KB")
        .arg("--filter")
        .arg("Stat")
        .arg("--output")
        .arg("json")
        .arg("--out-dir")
        .arg(dir)
        .args(extra)
        .output()
        .context("run objbench binary")
}

#[test]
fn invalid_flags_exit_30() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_objbench");

    let out = Command::new(exe)
        .arg("run")
        .arg("--driver")
        .arg("mem=memory://")
        .arg("--bench-time")
        .arg("10x")
        .output()
        .context("run objbench binary")?;

    ensure_code(&out, 30)
}

#[test]
fn missing_drivers_exit_30() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_objbench");

    let out = Command::new(exe)
        .arg("run")
        .arg("--bench-time")
        .arg("10ms")
        .output()
        .context("run objbench binary")?;

    ensure_code(&out, 30)
}

#[test]
fn unreachable_backends_exit_40() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_objbench");

    let out = Command::new(exe)
        .arg("run")
        .arg("--driver")
        .arg("x=nosuchscheme://host")
        .arg("--output")
        .arg("json")
        .output()
        .context("run objbench binary")?;

    ensure_code(&out, 40)
}

#[test]
fn memory_run_writes_reports_and_exits_0() -> anyhow::Result<()> {
    let dir = tempfile::tempdir().context("tempdir")?;
    let out = quick_memory_run(dir.path(), &[])?;
    ensure_code(&out, 0)?;

    for name in ["raw_results.json", "benchmark_report.md", "benchmark_results.csv"] {
        anyhow::ensure!(dir.path().join(name).exists(), "{name} was not written");
    }

    let stdout = String::from_utf8_lossy(&out.stdout);
    anyhow::ensure!(
        stdout.lines().any(|l| l.contains("\"kind\":\"summary\"")),
        "no summary line in stdout:\n{stdout}"
    );

    let csv = std::fs::read_to_string(dir.path().join("benchmark_results.csv"))?;
    anyhow::ensure!(csv.lines().any(|l| l.starts_with("mem,Stat,")), "no Stat row:\n{csv}");

    Ok(())
}

#[test]
fn regression_against_baseline_exits_10() -> anyhow::Result<()> {
    let dir = tempfile::tempdir().context("tempdir")?;
    let out = quick_memory_run(dir.path(), &[])?;
    ensure_code(&out, 0)?;

    // A baseline claiming ten times the throughput makes the current run a regression.
    let current = dir.path().join("raw_results.json");
    let mut doc: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&current)?).context("parse raw_results.json")?;
    let results = doc["results"]
        .as_array_mut()
        .context("results array missing")?;
    anyhow::ensure!(!results.is_empty(), "no results recorded");
    for r in results {
        let t = r["throughput"].as_f64().unwrap_or(0.0);
        r["throughput"] = serde_json::json!(t * 10.0 + 1.0);
    }
    let baseline = dir.path().join("baseline.json");
    std::fs::write(&baseline, serde_json::to_vec_pretty(&doc)?)?;

    let exe = env!("CARGO_BIN_EXE_objbench");
    let out = Command::new(exe)
        .arg("compare")
        .arg(&baseline)
        .arg(&current)
        .output()
        .context("run objbench compare")?;
    ensure_code(&out, 10)?;

    let out = Command::new(exe)
        .arg("compare")
        .arg(&current)
        .arg(&current)
        .output()
        .context("run objbench compare")?;
    ensure_code(&out, 0)
}

#[test]
fn compare_with_missing_file_exits_30() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_objbench");
    let out = Command::new(exe)
        .arg("compare")
        .arg("/no/such/baseline.json")
        .arg("/no/such/current.json")
        .output()
        .context("run objbench compare")?;

    ensure_code(&out, 30)
}
