//! Decision stage - renders the final verdict from scored findings
//!
//! The judge consumes the plan and the consensus report, makes one
//! generation call, and parses the sectioned response into a [`Verdict`].
//! Every scored finding reaches the prompt with its tier and corroboration
//! count, so the verdict stays traceable back to aggregated evidence.

use crate::error::Result;
use crate::llm_client::LlmClient;
use crate::openrouter::{CompletionRequest, Message};
use crate::pipeline::consensus::ConsensusReport;
use crate::sink::{ExampleSink, TrainingExample};
use crate::types::{CaseRecord, InvestigationRequest, RunContext, Verdict};
use chrono::Utc;
use std::sync::Arc;

const JUDGE_SYSTEM_PROMPT: &str = "You are the final decision-maker in an endpoint log analysis \
investigation. Your role is to:

1. Determine if there was a security incident based on the evidence
2. Deliver a clear verdict on the nature and severity of any security issues
3. Provide a concise summary of the attack or suspicious activity
4. Recommend SPECIFIC, ACTIONABLE remediation steps

For remediation, provide exact system commands or PowerShell/Bash scripts that the security \
team can execute. Be as specific as possible.

Format your response as:

VERDICT: [Clear statement on whether a security incident occurred]

SUMMARY: [Concise explanation of the findings]

ATTACK CLASSIFICATION: [MITRE ATT&CK tactics and techniques identified]

REMEDIATION COMMANDS:
```
[Exact commands to execute]
```

NEXT STEPS: [Additional investigation recommendations]";

const SECTION_HEADERS: [&str; 5] = [
    "VERDICT:",
    "SUMMARY:",
    "ATTACK CLASSIFICATION:",
    "REMEDIATION COMMANDS:",
    "NEXT STEPS:",
];

/// Decision stage
pub struct Judge {
    client: Arc<dyn LlmClient>,
    model: String,
    sink: Option<Arc<dyn ExampleSink>>,
}

impl Judge {
    /// Create a judge calling the given model
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            sink: None,
        }
    }

    /// Attach a best-effort training example sink
    pub fn with_sink(mut self, sink: Arc<dyn ExampleSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Render the final verdict and, best-effort, record a training example
    pub async fn decide(
        &self,
        request: &InvestigationRequest,
        record: &CaseRecord,
        report: &ConsensusReport,
        ctx: &RunContext,
    ) -> Result<Verdict> {
        let user = format!(
            "Security Investigation Request: {}\n\n\
             Original Plan:\n{}\n\n\
             Consolidated Findings (with voting results):\n{}\n\n\
             Based on this analysis, provide your final verdict and actionable remediation \
             steps. Focus on:\n\
             1. Clear determination of whether a security incident occurred\n\
             2. Specific MITRE ATT&CK tactics and techniques involved\n\
             3. Exact, executable commands for remediation\n\
             4. Additional investigation steps needed",
            request.query,
            record.plan.narrative,
            render_findings(report)
        );

        let completion = CompletionRequest::new(
            &self.model,
            vec![Message::system(JUDGE_SYSTEM_PROMPT), Message::user(user)],
        );

        ctx.record_generation();
        let response = self.client.complete(completion).await?;
        let raw = response.first_content().unwrap_or_default();
        let verdict = parse_verdict(raw);

        if let Some(sink) = &self.sink {
            let example = TrainingExample {
                run_id: ctx.run_id,
                recorded_at: Utc::now(),
                query: request.query.clone(),
                plan: record.plan.narrative.clone(),
                findings: record.findings().to_vec(),
                verdict: verdict.clone(),
            };
            if let Err(e) = sink.record(&example).await {
                tracing::warn!(run_id = %ctx.run_id, error = %e, "failed to record training example");
            }
        }

        Ok(verdict)
    }
}

/// Render scored findings for the decision prompt, tier and corroboration
/// count included for each
fn render_findings(report: &ConsensusReport) -> String {
    let mut out = String::new();
    for finding in &report.findings {
        out.push_str(&format!(
            "- [{} confidence, corroborated by {} specialist(s)] {}\n",
            finding.tier, finding.corroboration_count, finding.description
        ));
        for excerpt in &finding.supporting_evidence {
            out.push_str(&format!(
                "  * Evidence from {}: {}\n",
                excerpt.source_role, excerpt.excerpt
            ));
        }
        if let Some(technique) = &finding.attack_technique {
            out.push_str(&format!("  * MITRE ATT&CK: {}\n", technique));
        }
        if let Some(action) = &finding.recommended_action {
            out.push_str(&format!("  * Recommended Action: {}\n", action));
        }
    }
    out.push_str(&format!(
        "\nSUMMARY: {} total findings ({} high, {} medium, {} low confidence, {} eliminated)\n",
        report.tally.total,
        report.tally.high,
        report.tally.medium,
        report.tally.low,
        report.tally.eliminated
    ));
    out
}

fn section<'a>(raw: &'a str, header: &str) -> Option<&'a str> {
    let start = raw.find(header)? + header.len();
    let rest = &raw[start..];
    let end = SECTION_HEADERS
        .iter()
        .filter(|h| **h != header)
        .filter_map(|h| rest.find(h))
        .min()
        .unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// Parse a sectioned decision response; missing sections degrade to empty
fn parse_verdict(raw: &str) -> Verdict {
    let statement = section(raw, "VERDICT:").unwrap_or_else(|| raw.trim()).to_string();
    let summary = section(raw, "SUMMARY:").unwrap_or_default().to_string();
    let classification = section(raw, "ATTACK CLASSIFICATION:")
        .unwrap_or_default()
        .to_string();
    let next_steps = section(raw, "NEXT STEPS:").unwrap_or_default().to_string();

    let remediation_commands = section(raw, "REMEDIATION COMMANDS:")
        .map(|body| {
            body.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with("```"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Verdict {
        statement,
        summary,
        classification,
        remediation_commands,
        next_steps,
        raw_text: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::consensus::{ConsensusAggregator, FindingTally};
    use crate::pipeline::executor::tests::ScriptedClient;
    use crate::plan::Plan;
    use crate::roles::Role;
    use crate::types::{Finding, RunId};

    const DECISION: &str = "VERDICT: A security incident occurred.\n\n\
        SUMMARY: Lateral movement between WS-01 and WS-02.\n\n\
        ATTACK CLASSIFICATION: TA0008 Lateral Movement, T1021.002.\n\n\
        REMEDIATION COMMANDS:\n```\nnet session \\\\WS-02 /delete\nGet-SmbSession\n```\n\n\
        NEXT STEPS: Image both workstations.";

    fn case_record() -> CaseRecord {
        let plan = Plan {
            narrative: "trace SMB".to_string(),
            assignments: vec![],
        };
        CaseRecord::from_settled(
            plan,
            vec![Finding::new(
                1,
                Role::LateralMovement,
                "SMB session from WS-01 to WS-02 at 2024-05-01T10:02:11Z",
            )],
        )
    }

    #[test]
    fn test_parse_sectioned_verdict() {
        let verdict = parse_verdict(DECISION);
        assert_eq!(verdict.statement, "A security incident occurred.");
        assert_eq!(verdict.summary, "Lateral movement between WS-01 and WS-02.");
        assert!(verdict.classification.contains("T1021.002"));
        assert_eq!(
            verdict.remediation_commands,
            vec!["net session \\\\WS-02 /delete", "Get-SmbSession"]
        );
        assert_eq!(verdict.next_steps, "Image both workstations.");
    }

    #[test]
    fn test_unsectioned_response_degrades_to_statement() {
        let verdict = parse_verdict("nothing suspicious here");
        assert_eq!(verdict.statement, "nothing suspicious here");
        assert!(verdict.summary.is_empty());
        assert!(verdict.remediation_commands.is_empty());
    }

    #[test]
    fn test_rendered_findings_surface_tier_and_count() {
        let record = case_record();
        let report = ConsensusAggregator::new().aggregate(&record);
        let rendered = render_findings(&report);
        assert!(rendered.contains("[Low confidence, corroborated by 1 specialist(s)]"));
        assert!(rendered.contains("1 total findings"));
    }

    #[test]
    fn test_tally_renders_eliminated_count() {
        let report = ConsensusReport {
            findings: vec![],
            tally: FindingTally {
                total: 4,
                high: 1,
                medium: 1,
                low: 2,
                eliminated: 1,
            },
        };
        assert!(render_findings(&report).contains("1 eliminated"));
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        use crate::error::Error;
        use async_trait::async_trait;

        struct FailingSink;
        #[async_trait]
        impl ExampleSink for FailingSink {
            async fn record(&self, _example: &TrainingExample) -> crate::error::Result<()> {
                Err(Error::sink("disk full"))
            }
        }

        let client: Arc<dyn LlmClient> = Arc::new(ScriptedClient::returning(DECISION));
        let judge = Judge::new(client, "test-model").with_sink(Arc::new(FailingSink));
        let request = InvestigationRequest::new("q", "{}");
        let record = case_record();
        let report = ConsensusAggregator::new().aggregate(&record);
        let ctx = RunContext::new(RunId::new());

        // The run still yields a verdict even though the sink failed
        let verdict = judge.decide(&request, &record, &report, &ctx).await.unwrap();
        assert_eq!(verdict.statement, "A security incident occurred.");
    }
}
