pub mod executor;
pub mod orchestrator;
pub mod types;

pub use executor::{Applier, CherryPickExecutor};
pub use orchestrator::BackportOrchestrator;
pub use types::{ApplyResult, BackportReport, BackportTask, BranchOutcome, BranchTarget};
