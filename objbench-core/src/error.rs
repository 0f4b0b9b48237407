pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::Error),

    #[error("no storage drivers configured")]
    NoDrivers,

    #[error("no storage drivers available")]
    NoBackendsAvailable,

    #[error("`concurrency` must be a positive integer")]
    InvalidConcurrency,

    #[error("`max_bench_iterations` must be >= max(1, `min_bench_iterations`)")]
    InvalidIterations,

    #[error("`object_sizes` must contain at least one size")]
    InvalidSizes,

    #[error("invalid size `{0}` (expected e.g. 1KB, 64KiB, 1MB or a byte count)")]
    InvalidSize(String),

    #[error("invalid driver `{0}` (expected NAME=DSN)")]
    InvalidDriver(String),

    #[error("scenario `{scenario}` setup failed: {source}")]
    Setup {
        scenario: String,
        #[source]
        source: crate::storage::Error,
    },
}
