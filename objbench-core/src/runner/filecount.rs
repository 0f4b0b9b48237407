use objbench_metrics::{Collector, Metrics};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::execute::with_timeout;
use super::ops::{CONTENT_TYPE, Target};
use crate::keys::random_payload;
use crate::size::KB;

const FILE_SIZE: u64 = KB;

/// Bulk write, list and delete of `files` objects, each timed as one sample.
///
/// Every phase yields one snapshot whose `batch` is `files`. Individual
/// failures count as errors without stopping the phase.
pub(crate) async fn run_file_count(
    target: &Target,
    driver: &str,
    files: u64,
    cancel: &CancellationToken,
) -> Vec<Metrics> {
    let scope = target.keys.scope(&format!("bench/filecount/{files}"));
    let keys: Vec<String> = (0..files).map(|i| format!("{scope}/{i:05}")).collect();
    let body = random_payload(FILE_SIZE);

    let mut out = Vec::with_capacity(3);

    let collector = Collector::new();
    let started = Instant::now();
    let mut written = 0u64;
    for key in &keys {
        if cancel.is_cancelled() {
            break;
        }
        match with_timeout(target.timeout, target.bucket.write(key, body.clone(), CONTENT_TYPE))
            .await
        {
            Ok(_) => written += 1,
            Err(err) => collector.record_failure(&err),
        }
    }
    if written > 0 {
        collector.record_success(started.elapsed());
    }
    out.push(finish(
        &collector,
        &format!("FileCount/Write/{files}"),
        driver,
        FILE_SIZE.saturating_mul(files),
        files,
        cancel,
    ));

    if !cancel.is_cancelled() {
        let collector = Collector::new();
        let limit = usize::try_from(files.saturating_add(100)).unwrap_or(usize::MAX);
        let started = Instant::now();
        let res = with_timeout(target.timeout, target.bucket.list(&format!("{scope}/"), limit, 0)).await;
        let elapsed = started.elapsed();
        match res {
            Ok(listed) if listed.len() as u64 == files => collector.record_success(elapsed),
            Ok(listed) => collector.record_failure(&format!(
                "listed {}, expected {files}",
                listed.len()
            )),
            Err(err) => collector.record_failure(&err),
        }
        out.push(finish(
            &collector,
            &format!("FileCount/List/{files}"),
            driver,
            0,
            files,
            cancel,
        ));
    }

    // Delete runs even after cancellation so the bucket is not left full.
    let collector = Collector::new();
    let started = Instant::now();
    let mut deleted = 0u64;
    for key in keys.iter().take(usize::try_from(written).unwrap_or(usize::MAX)) {
        match with_timeout(target.timeout, target.bucket.delete(key)).await {
            Ok(()) => deleted += 1,
            Err(err) => collector.record_failure(&err),
        }
    }
    if deleted > 0 {
        collector.record_success(started.elapsed());
    }
    if !cancel.is_cancelled() {
        out.push(finish(
            &collector,
            &format!("FileCount/Delete/{files}"),
            driver,
            0,
            files,
            cancel,
        ));
    } else {
        debug!(driver, files, deleted, "file-count objects removed after cancellation");
    }

    out
}

fn finish(
    collector: &Collector,
    label: &str,
    driver: &str,
    size: u64,
    files: u64,
    cancel: &CancellationToken,
) -> Metrics {
    let m = collector.snapshot(label, driver, size).with_batch(files);
    if cancel.is_cancelled() {
        m.with_note("stopped early: run cancelled")
    } else {
        m
    }
}
