//! Planning stage - interprets the investigation request and assigns roles

use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::openrouter::{CompletionRequest, Message};
use crate::plan::{parse_plan, Plan};
use crate::roles::ALL_ROLES;
use crate::types::{InvestigationRequest, RunContext};
use std::sync::Arc;

const PLANNER_SYSTEM_PROMPT: &str = "You are a security planning agent specialized in endpoint \
detection log analysis.

Your task is to:
1. Interpret a security investigation request
2. Create a detailed plan for analyzing the provided logs
3. Select the most appropriate specialized worker analysts for parallel analysis

Select workers from these EXACT security specialties (use these exact names):
{role_menu}

Log event types to consider:
- DetectionSummaryEvents: Security incidents and MITRE info
- FirewallMatchEvents: Network traffic triggers
- NetworkConnectionEvents: All network connections
- ProcessRollupEvents: Process execution details
- RegistryEvents: Windows registry operations
- AuthActivityAuditEvents: Authentication events
- DnsRequestEvents: DNS lookups made by systems

Format your response EXACTLY as follows (do not use markdown formatting):
PLAN: [detailed plan for log analysis]

WORKERS:
1. [specialty name]: [specific focus areas and tasks]
2. [specialty name]: [specific focus areas and tasks]

IMPORTANT: Use the EXACT role names as listed above. Do not modify them or add any formatting.";

/// Planning stage
///
/// Produces the [`Plan`] exactly once per run. Generation failures are
/// retried a bounded number of times and then fatal; malformed plan text is
/// recovered tolerantly and only logged.
pub struct Planner {
    client: Arc<dyn LlmClient>,
    model: String,
    max_retries: u32,
}

impl Planner {
    /// Create a planner calling the given model
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_retries: 2,
        }
    }

    /// Set bounded retries for failed generation calls
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Produce the plan for a request
    pub async fn plan(&self, request: &InvestigationRequest, ctx: &RunContext) -> Result<Plan> {
        let slots = request.limits.worker_slots;
        let system = Self::system_prompt();
        let user = format!(
            "Security Investigation Request: {}\n\n\
             Log Preview: {}\n\n\
             Create a detailed investigation plan and select the {} most relevant worker \
             specialists for parallel analysis. For each worker, specify:\n\
             1. Their MITRE ATT&CK focus areas\n\
             2. Specific log types they should analyze\n\
             3. Types of evidence they should look for\n\
             4. Platform-specific commands they should provide (Windows, Linux, macOS)\n\n\
             Remember to use the EXACT role names as provided in the system prompt.",
            request.query, request.evidence, slots
        );

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            let completion = CompletionRequest::new(
                &self.model,
                vec![Message::system(&system), Message::user(&user)],
            )
            .with_temperature(0.0);

            ctx.record_generation();
            match self.client.complete(completion).await {
                Ok(response) => {
                    let raw = response.first_content().unwrap_or_default();
                    let parsed = parse_plan(raw, slots);
                    for warning in &parsed.warnings {
                        tracing::warn!(run_id = %ctx.run_id, warning, "plan parse warning");
                    }
                    tracing::info!(
                        run_id = %ctx.run_id,
                        assignments = parsed.plan.assignments.len(),
                        slots,
                        "planning complete"
                    );
                    return Ok(parsed.plan);
                }
                Err(e) => {
                    tracing::warn!(
                        run_id = %ctx.run_id,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "planning generation call failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(Error::planning(format!(
            "planning failed after {} attempts: {}",
            self.max_retries + 1,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    fn system_prompt() -> String {
        let role_menu = ALL_ROLES
            .iter()
            .map(|r| format!("- {}", r.canonical_name()))
            .collect::<Vec<_>>()
            .join("\n");
        PLANNER_SYSTEM_PROMPT.replace("{role_menu}", &role_menu)
    }
}
