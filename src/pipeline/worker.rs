//! Worker unit - one role-scoped analysis per slot
//!
//! Workers are stateless and run independently: each consumes the shared
//! investigation context and produces a finding for exactly its own slot.
//! They never communicate with sibling slots.

use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::openrouter::{CompletionRequest, Message};
use crate::plan::{Plan, RoleAssignment};
use crate::types::{Finding, InvestigationRequest, RunContext};
use std::sync::Arc;

/// A worker bound to one slot's role assignment
pub struct Worker {
    slot: usize,
    assignment: RoleAssignment,
}

impl Worker {
    /// Bind a worker to a 1-based slot and its assignment
    pub fn new(slot: usize, assignment: RoleAssignment) -> Self {
        Self { slot, assignment }
    }

    /// Slot this worker writes
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Assignment this worker executes
    pub fn assignment(&self) -> &RoleAssignment {
        &self.assignment
    }

    /// Run the role-scoped analysis, producing this slot's finding
    pub async fn investigate(
        &self,
        client: &Arc<dyn LlmClient>,
        model: &str,
        request: &InvestigationRequest,
        plan: &Plan,
        evidence_char_cap: usize,
        ctx: &RunContext,
    ) -> Result<Finding> {
        let role = self.assignment.role;
        tracing::debug!(run_id = %ctx.run_id, slot = self.slot, role = %role, "worker starting");

        let evidence = truncate_chars(&request.evidence, evidence_char_cap);
        let user = format!(
            "Security Investigation Request: {}\n\n\
             Overall Analysis Plan: {}\n\n\
             Your Specific Task: {}\n\n\
             Log Sample:\n```\n{}\n```\n\n\
             Analyze these logs according to your security specialty ({}). Provide:\n\n\
             1. EVIDENCE: List specific log entries that indicate suspicious activity in your domain\n\
             2. ANALYSIS: Explain what these entries reveal and their security implications\n\
             3. CONFIDENCE: Rate your confidence in each finding (High/Medium/Low)\n\
             4. RECOMMENDATIONS: Suggest specific next investigative steps\n\n\
             For each recommendation, provide platform-specific commands in backticks.\n\n\
             Focus only on findings relevant to your specialty ({}). Be specific and cite \
             exact log entries.",
            request.query, plan.narrative, self.assignment.task, evidence, role, role
        );

        let completion = CompletionRequest::new(
            model,
            vec![Message::system(role.briefing()), Message::user(user)],
        );

        ctx.record_generation();
        let response = client
            .complete(completion)
            .await
            .map_err(|e| Error::worker(self.slot, e.to_string()))?;
        let content = response.first_content().unwrap_or_default().to_string();

        tracing::debug!(run_id = %ctx.run_id, slot = self.slot, role = %role, "worker finished");
        Ok(Finding::new(self.slot, role, content))
    }
}

/// Truncate on a character boundary so multi-byte evidence never panics
fn truncate_chars(text: &str, cap: usize) -> &str {
    match text.char_indices().nth(cap) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
