#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// At least one result regressed against the baseline.
    Regressions = 10,

    /// Interrupted; partial results were still written.
    Cancelled = 20,

    /// Invalid CLI/config (bad flags, unknown drivers, malformed sizes or durations, etc.).
    InvalidInput = 30,

    /// Internal/runtime error (IO errors, no reachable backend, unexpected invariants).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_outcome(cancelled: bool, regressions: bool) -> Self {
        match (cancelled, regressions) {
            (true, _) => Self::Cancelled,
            (false, true) => Self::Regressions,
            (false, false) => Self::Success,
        }
    }
}
