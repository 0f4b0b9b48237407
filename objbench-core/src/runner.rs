mod execute;
mod filecount;
mod ops;
mod orchestrator;
mod progress;
mod scenario;
mod suite;

pub use orchestrator::{RunOutcome, Runner};
pub use progress::{ProgressEvent, ProgressFn, RunState};
pub use scenario::{EdgeCase, Scenario, ScenarioKind};
