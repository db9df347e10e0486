//! # Inquest
//!
//! A fixed-width parallel investigation pipeline for endpoint security logs,
//! built with Rust.
//!
//! One planning stage interprets the investigation request and assigns
//! specialist roles, N workers analyze the evidence in parallel, a consensus
//! stage clusters and scores their findings by cross-specialist
//! corroboration, and a decision stage renders the final verdict.
//!
//! ## Features
//!
//! - **Fixed topology**: planning, parallel workers, join barrier, consensus,
//!   decision - the same shape every run
//! - **Degraded slots, completed runs**: a failed or timed-out worker yields
//!   a sentinel finding instead of failing the investigation
//! - **Deterministic consensus**: identifier-based clustering with no
//!   generation calls, so the same findings always score the same way
//! - **OpenRouter Integration**: access to hosted models through a single API
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use inquest::{GraphExecutor, JsonlEvidenceSource, OpenRouterClient, PipelineConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Arc::new(OpenRouterClient::from_env()?);
//!     let executor = GraphExecutor::new(client, PipelineConfig::default());
//!
//!     let source = JsonlEvidenceSource::new("events.jsonl", 50);
//!     let report = executor
//!         .investigate("Was there lateral movement on this host?", &source)
//!         .await?;
//!
//!     println!("{}", report.verdict.statement);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod evidence;
pub mod llm_client;
pub mod openrouter;
pub mod pipeline;
pub mod plan;
pub mod roles;
pub mod sink;
pub mod types;

// Re-exports for convenience
pub use config::{OpenRouterConfig, PipelineConfig};
pub use error::{Error, Result};
pub use evidence::{EvidenceSource, JsonlEvidenceSource, StaticEvidence};
pub use llm_client::LlmClient;
pub use openrouter::{CompletionRequest, CompletionResponse, Message, OpenRouterClient};
pub use pipeline::{
    ConsensusAggregator, ConsensusReport, FindingTally, GraphExecutor, InvestigationReport, Judge,
    Planner, Worker,
};
pub use plan::{Plan, RoleAssignment};
pub use roles::{Role, ALL_ROLES, DEFAULT_ROLE};
pub use sink::{ExampleSink, JsonlExampleSink, TrainingExample};
pub use types::{
    CaseRecord, ConfidenceTier, EvidenceExcerpt, ExecutionLimits, Finding, InvestigationRequest,
    RunContext, RunId, ScoredFinding, Verdict,
};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::error::{Error, Result};
    pub use crate::evidence::{EvidenceSource, JsonlEvidenceSource};
    pub use crate::openrouter::OpenRouterClient;
    pub use crate::pipeline::{GraphExecutor, InvestigationReport};
    pub use crate::types::*;
}
