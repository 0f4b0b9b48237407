//! Round-by-round iteration planning toward a target measured duration.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Decides how many operations the next round runs.
///
/// The first round is a single operation. Each following round is
/// extrapolated from the previous one so that cumulative measured time
/// converges on the target:
///
/// ```text
/// next = goal * size / max(elapsed, 1ns)
/// next += next / 5
/// next = min(next, 100 * size)
/// next = max(next, size + 1)
/// next = min(next, max_iterations - total)
/// ```
#[derive(Debug)]
pub struct AdaptiveController {
    target: Duration,
    min_iterations: u64,
    max_iterations: u64,
    cancel: CancellationToken,

    total_iterations: u64,
    total_elapsed: Duration,
    next: u64,
    started: bool,
}

impl AdaptiveController {
    pub fn new(
        target: Duration,
        min_iterations: u64,
        max_iterations: u64,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            target,
            min_iterations,
            max_iterations,
            cancel,
            total_iterations: 0,
            total_elapsed: Duration::ZERO,
            next: 1,
            started: false,
        }
    }

    /// Loop predicate, checked before every round.
    pub fn should_continue(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let below_floor =
            self.total_iterations < self.min_iterations || self.total_elapsed < self.target;
        below_floor && self.total_iterations < self.max_iterations
    }

    pub fn next_round_size(&mut self) -> u64 {
        if !self.started {
            self.started = true;
            return 1;
        }
        self.next
    }

    pub fn record_round(&mut self, size: u64, elapsed: Duration) {
        self.total_elapsed = self.total_elapsed.saturating_add(elapsed);
        self.total_iterations = self.total_iterations.saturating_add(size);

        if self.should_continue() {
            self.next = self.extrapolate(size, elapsed);
        }
    }

    pub fn total_iterations(&self) -> u64 {
        self.total_iterations
    }

    pub fn total_elapsed(&self) -> Duration {
        self.total_elapsed
    }

    pub fn target(&self) -> Duration {
        self.target
    }

    fn extrapolate(&self, size: u64, elapsed: Duration) -> u64 {
        let size = u128::from(size.max(1));
        let goal = self.target.as_nanos();
        let prev = elapsed.as_nanos().max(1);

        // Multiply before dividing to keep precision.
        let mut next = goal.saturating_mul(size) / prev;
        next = next.saturating_add(next / 5);
        next = next.min(size.saturating_mul(100));
        next = next.max(size + 1);

        let remaining = self.max_iterations.saturating_sub(self.total_iterations);
        next = next.min(u128::from(remaining)).max(1);

        u64::try_from(next).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctl(target: Duration, min: u64, max: u64) -> AdaptiveController {
        AdaptiveController::new(target, min, max, CancellationToken::new())
    }

    #[test]
    fn first_round_is_always_one() {
        for (t, min, max) in [(0, 0, 1), (1_000, 3, 1_000_000), (5, 100, 100)] {
            let mut c = ctl(Duration::from_millis(t), min, max);
            assert_eq!(c.next_round_size(), 1);
        }
    }

    #[test]
    fn growth_is_bounded_and_strictly_increasing() {
        let mut c = ctl(Duration::from_secs(1), 1_000, 1_000_000);

        // 1 op in 1us would extrapolate to ~1.2M; capped at 100x.
        let n = c.next_round_size();
        c.record_round(n, Duration::from_micros(1));
        assert_eq!(c.next_round_size(), 100);

        // 100 ops in 2s extrapolates to 60; still below the floor, so size + 1.
        c.record_round(100, Duration::from_secs(2));
        assert!(c.should_continue());
        assert_eq!(c.next_round_size(), 101);
    }

    #[test]
    fn extrapolates_with_safety_margin() {
        let mut c = ctl(Duration::from_secs(1), 1, 1_000_000);
        let n = c.next_round_size();
        c.record_round(n, Duration::from_millis(10));
        // 1s / 10ms = 100, +20% = 120, capped at 100 * 1
        assert_eq!(c.next_round_size(), 100);

        c.record_round(100, Duration::from_millis(100));
        // total 110ms < 1s; 1s * 100 / 100ms = 1000, +20% = 1200, cap 10000
        assert_eq!(c.next_round_size(), 1200);
    }

    #[test]
    fn minimum_iterations_enforced_after_slow_first_round() {
        let mut c = ctl(Duration::from_millis(10), 5, 1_000);
        let mut rounds = 0;
        while c.should_continue() {
            let n = c.next_round_size();
            c.record_round(n, Duration::from_secs(1));
            rounds += 1;
        }
        assert!(c.total_iterations() >= 5);
        assert!(rounds >= 2);
    }

    #[test]
    fn never_exceeds_max_iterations() {
        let mut c = ctl(Duration::from_secs(3600), 1, 250);
        while c.should_continue() {
            let n = c.next_round_size();
            c.record_round(n, Duration::from_nanos(1));
        }
        assert_eq!(c.total_iterations(), 250);
    }

    #[test]
    fn terminates_with_target_or_ceiling() {
        let op = Duration::from_micros(37);
        let mut c = ctl(Duration::from_millis(50), 3, 100_000);
        while c.should_continue() {
            let n = c.next_round_size();
            c.record_round(n, op * n as u32);
        }
        assert!(c.total_iterations() >= 3);
        assert!(c.total_elapsed() >= Duration::from_millis(50) || c.total_iterations() == 100_000);
        assert_eq!(c.total_elapsed(), op * c.total_iterations() as u32);
    }

    #[test]
    fn same_inputs_same_plan() {
        let rounds = [
            Duration::from_micros(3),
            Duration::from_micros(290),
            Duration::from_millis(31),
            Duration::from_millis(400),
        ];
        let plan = || {
            let mut c = ctl(Duration::from_secs(1), 3, 1_000_000);
            let mut out = Vec::new();
            for d in rounds {
                let n = c.next_round_size();
                out.push(n);
                c.record_round(n, d);
            }
            out.push(c.next_round_size());
            out
        };
        assert_eq!(plan(), plan());
    }

    #[test]
    fn cancelled_before_start_runs_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let c = AdaptiveController::new(Duration::from_secs(1), 3, 100, token);
        assert!(!c.should_continue());
        assert_eq!(c.total_iterations(), 0);
    }

    #[test]
    fn cancellation_mid_loop_stops_after_current_round() {
        let token = CancellationToken::new();
        let mut c = AdaptiveController::new(Duration::from_secs(1), 3, 1_000, token.clone());

        let mut rounds = 0;
        while c.should_continue() {
            let n = c.next_round_size();
            rounds += 1;
            if rounds == 2 {
                token.cancel();
            }
            c.record_round(n, Duration::from_millis(1));
        }
        assert_eq!(rounds, 2);
    }
}
