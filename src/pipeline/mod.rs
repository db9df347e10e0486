//! Pipeline stages - the fixed investigation topology
//!
//! One planning stage fans out to N parallel worker units, a join barrier
//! merges their findings into the case record, the consensus aggregator
//! scores agreement, and the decision stage renders the verdict:
//!
//! ```text
//! planner --> worker 1..N (parallel) --> join --> consensus --> judge
//! ```
//!
//! The topology is fixed by construction; there are no dynamic edges.

pub mod consensus;
pub mod executor;
pub mod judge;
pub mod planner;
pub mod worker;

// Re-exports
pub use consensus::{ConsensusAggregator, ConsensusReport, FindingTally};
pub use executor::{GraphExecutor, InvestigationReport};
pub use judge::Judge;
pub use planner::Planner;
pub use worker::Worker;
