use std::time::Duration;

/// Nearest-rank percentile over samples sorted ascending.
///
/// The index is `floor((n - 1) * p / 100)`. Any `p >= 100` yields the maximum,
/// `p <= 0` the minimum, and an empty slice yields `Duration::ZERO`.
#[must_use]
pub fn percentile(sorted: &[Duration], p: f64) -> Duration {
    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return Duration::ZERO;
    };

    if p >= 100.0 {
        return *last;
    }
    if p <= 0.0 || p.is_nan() {
        return *first;
    }

    let idx = (((sorted.len() - 1) as f64) * p / 100.0).floor() as usize;
    sorted.get(idx).copied().unwrap_or(*last)
}
