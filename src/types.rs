//! Core type definitions for the investigation pipeline

use crate::plan::Plan;
use crate::roles::Role;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for an investigation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random run ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a run ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-run context threaded explicitly through the executor
///
/// Replaces any process-wide counters so concurrent runs stay isolated.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Run this context belongs to
    pub run_id: RunId,
    generation_calls: Arc<AtomicU32>,
}

impl RunContext {
    /// Create a fresh context for a new run
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            generation_calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Record one generation call, returning the new total
    pub fn record_generation(&self) -> u32 {
        self.generation_calls.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Total generation calls recorded so far
    pub fn generation_calls(&self) -> u32 {
        self.generation_calls.load(Ordering::Relaxed)
    }
}

/// Execution limits for a single run
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExecutionLimits {
    /// Number of parallel worker slots
    pub worker_slots: usize,
    /// Bounded retries for the planning stage before the run fails
    pub max_plan_retries: u32,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            worker_slots: 5,
            max_plan_retries: 2,
        }
    }
}

/// Immutable investigation request, created once per run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationRequest {
    /// Free-text investigation query
    pub query: String,
    /// Pre-sampled evidence payload, treated as an opaque text blob
    pub evidence: String,
    /// Execution limits for this run
    pub limits: ExecutionLimits,
}

impl InvestigationRequest {
    /// Create a request with default limits
    pub fn new(query: impl Into<String>, evidence: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            evidence: evidence.into(),
            limits: ExecutionLimits::default(),
        }
    }

    /// Set the execution limits
    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Marker prefix for sentinel findings written on worker failure
pub const SENTINEL_MARKER: &str = "ANALYSIS UNAVAILABLE";

/// A single worker's report, immutable once emitted
///
/// Evidence references are implicit in the raw text; the consensus stage
/// extracts them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Slot this finding occupies, 1-based
    pub slot: usize,
    /// Role the producing worker was bound to
    pub source_role: Role,
    /// Full analysis text
    pub raw_text: String,
}

impl Finding {
    /// Create a finding from a successful worker invocation
    pub fn new(slot: usize, source_role: Role, raw_text: impl Into<String>) -> Self {
        Self {
            slot,
            source_role,
            raw_text: raw_text.into(),
        }
    }

    /// Create a sentinel finding for a failed or timed-out slot
    pub fn sentinel(slot: usize, source_role: Role, reason: impl fmt::Display) -> Self {
        Self {
            slot,
            source_role,
            raw_text: format!("{}: {}", SENTINEL_MARKER, reason),
        }
    }

    /// Whether this finding is a failure sentinel
    pub fn is_sentinel(&self) -> bool {
        self.raw_text.starts_with(SENTINEL_MARKER)
    }
}

/// The shared merge target: one finding per slot, plus the plan
///
/// Slot cardinality is fixed at construction regardless of worker failures.
/// Each slot is written by exactly one worker; downstream stages only read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    /// The plan the workers executed against
    pub plan: Plan,
    findings: Vec<Finding>,
}

impl CaseRecord {
    /// Assemble a record from settled findings, one per slot in slot order
    ///
    /// Findings may arrive in any completion order; they are placed by their
    /// slot index, so the record is identical for any permutation.
    pub fn from_settled(plan: Plan, mut findings: Vec<Finding>) -> Self {
        findings.sort_by_key(|f| f.slot);
        debug_assert!(
            findings.iter().enumerate().all(|(i, f)| f.slot == i + 1),
            "slot indices must be exactly 1..=N"
        );
        Self { plan, findings }
    }

    /// Number of slots in this record
    pub fn slot_count(&self) -> usize {
        self.findings.len()
    }

    /// Finding for a 1-based slot index
    pub fn finding(&self, slot: usize) -> Option<&Finding> {
        self.findings.get(slot.checked_sub(1)?)
    }

    /// All findings in slot order
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }
}

/// Confidence tier assigned to a scored finding
///
/// Declaration order is presentation order: High sorts before Medium before
/// Low under the derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    /// Three or more distinct roles corroborate the finding
    High,
    /// Exactly two distinct roles corroborate the finding
    Medium,
    /// A single role reported the finding
    Low,
}

impl ConfidenceTier {
    /// Tier is a pure function of the corroboration count
    pub fn from_corroboration(count: usize) -> Self {
        match count {
            c if c >= 3 => ConfidenceTier::High,
            2 => ConfidenceTier::Medium,
            _ => ConfidenceTier::Low,
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfidenceTier::High => "High",
            ConfidenceTier::Medium => "Medium",
            ConfidenceTier::Low => "Low",
        };
        write!(f, "{}", s)
    }
}

/// One excerpt of supporting evidence inside a scored finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceExcerpt {
    /// Role that reported the excerpt
    pub source_role: Role,
    /// The claim text as reported
    pub excerpt: String,
}

/// A consensus-scored finding produced by the aggregator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredFinding {
    /// Short description of the underlying event
    pub description: String,
    /// Supporting excerpts in originating slot order
    pub supporting_evidence: Vec<EvidenceExcerpt>,
    /// Number of distinct roles that corroborated the event
    pub corroboration_count: usize,
    /// Tier derived from the corroboration count
    pub tier: ConfidenceTier,
    /// ATT&CK technique id if one was cited (e.g. "T1021")
    pub attack_technique: Option<String>,
    /// Recommended action if one was cited
    pub recommended_action: Option<String>,
}

/// Terminal artifact of a run, produced once by the decision stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether an incident occurred, as stated by the decision stage
    pub statement: String,
    /// Concise explanation of the findings
    pub summary: String,
    /// ATT&CK tactics and techniques identified
    pub classification: String,
    /// Exact remediation commands to execute
    pub remediation_commands: Vec<String>,
    /// Additional investigation recommendations
    pub next_steps: String,
    /// Full unparsed decision text
    pub raw_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_from_corroboration() {
        assert_eq!(ConfidenceTier::from_corroboration(5), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_corroboration(3), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_corroboration(2), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_corroboration(1), ConfidenceTier::Low);
        assert_eq!(ConfidenceTier::from_corroboration(0), ConfidenceTier::Low);
    }

    #[test]
    fn test_tier_presentation_order() {
        let mut tiers = vec![ConfidenceTier::Low, ConfidenceTier::High, ConfidenceTier::Medium];
        tiers.sort();
        assert_eq!(
            tiers,
            vec![ConfidenceTier::High, ConfidenceTier::Medium, ConfidenceTier::Low]
        );
    }

    #[test]
    fn test_sentinel_finding() {
        let finding = Finding::sentinel(3, Role::Persistence, "generation call timed out");
        assert!(finding.is_sentinel());
        assert_eq!(finding.source_role, Role::Persistence);
        assert!(finding.raw_text.contains("timed out"));
    }

    #[test]
    fn test_run_context_counter_is_per_run() {
        let a = RunContext::new(RunId::new());
        let b = RunContext::new(RunId::new());
        a.record_generation();
        a.record_generation();
        assert_eq!(a.generation_calls(), 2);
        assert_eq!(b.generation_calls(), 0);
    }
}
