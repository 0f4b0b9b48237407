pub mod collector;
pub mod metrics;
pub mod percentile;
pub mod serde_duration;

pub use collector::Collector;
pub use metrics::{DurationStats, Metrics};
pub use percentile::percentile;
