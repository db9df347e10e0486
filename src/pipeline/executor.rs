//! Graph executor - builds and runs the fixed investigation topology
//!
//! One planning stage, N worker units in parallel, a join barrier, one
//! consensus pass, one decision pass. Worker outputs merge into the case
//! record in slot order regardless of completion order, and a failed or
//! timed-out worker degrades only its own slot.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::evidence::EvidenceSource;
use crate::llm_client::LlmClient;
use crate::pipeline::consensus::{ConsensusAggregator, ConsensusReport};
use crate::pipeline::judge::Judge;
use crate::pipeline::planner::Planner;
use crate::pipeline::worker::Worker;
use crate::sink::ExampleSink;
use crate::types::{
    CaseRecord, ExecutionLimits, Finding, InvestigationRequest, RunContext, RunId, Verdict,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;

/// Structured result of one investigation run
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InvestigationReport {
    /// Run identifier
    pub run_id: RunId,
    /// Plan plus all slot findings
    pub record: CaseRecord,
    /// Scored findings and tally
    pub consensus: ConsensusReport,
    /// Final verdict
    pub verdict: Verdict,
    /// Generation calls made during the run
    pub generation_calls: u32,
    /// Total wall-clock time
    pub elapsed_ms: u64,
}

/// Executor for the fixed investigation topology
pub struct GraphExecutor {
    client: Arc<dyn LlmClient>,
    config: PipelineConfig,
    sink: Option<Arc<dyn ExampleSink>>,
}

impl GraphExecutor {
    /// Create an executor over a generation client and pipeline config
    pub fn new(client: Arc<dyn LlmClient>, config: PipelineConfig) -> Self {
        Self {
            client,
            config,
            sink: None,
        }
    }

    /// Attach a best-effort training example sink
    pub fn with_sink(mut self, sink: Arc<dyn ExampleSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Read evidence from a source, then run the investigation
    ///
    /// An evidence read failure is fatal and happens before any worker
    /// dispatch.
    pub async fn investigate(
        &self,
        query: impl Into<String>,
        source: &dyn EvidenceSource,
    ) -> Result<InvestigationReport> {
        let evidence = source.read().await?;
        let request = InvestigationRequest::new(query, evidence).with_limits(ExecutionLimits {
            worker_slots: self.config.worker_slots,
            max_plan_retries: self.config.max_plan_retries,
        });
        self.run(request).await
    }

    /// Run the fixed topology over an already-assembled request
    pub async fn run(&self, request: InvestigationRequest) -> Result<InvestigationReport> {
        let start = Instant::now();
        let ctx = RunContext::new(RunId::new());
        let slots = request.limits.worker_slots;
        tracing::info!(run_id = %ctx.run_id, slots, query = %request.query, "starting investigation");

        // Stage 1: planning. Fatal after bounded retries.
        let planner = Planner::new(self.client.clone(), &self.config.planner_model)
            .with_max_retries(request.limits.max_plan_retries);
        let plan = planner.plan(&request, &ctx).await?;

        // Stage 2: fan out one worker per slot. Unfilled slots get the
        // neutral placeholder assignment.
        let workers: Vec<Worker> = (1..=slots)
            .map(|slot| Worker::new(slot, plan.assignment(slot)))
            .collect();

        let futures = workers.iter().map(|worker| {
            let slot = worker.slot();
            let role = worker.assignment().role;
            let request = &request;
            let plan = &plan;
            let ctx = &ctx;
            async move {
                let attempt = tokio::time::timeout(
                    self.config.worker_timeout(),
                    worker.investigate(
                        &self.client,
                        &self.config.worker_model,
                        request,
                        plan,
                        self.config.evidence_char_cap,
                        ctx,
                    ),
                )
                .await;

                match attempt {
                    Ok(Ok(finding)) => finding,
                    Ok(Err(e)) => {
                        tracing::warn!(run_id = %ctx.run_id, slot, role = %role, error = %e, "worker failed, writing sentinel");
                        Finding::sentinel(slot, role, e)
                    }
                    Err(_) => {
                        tracing::warn!(run_id = %ctx.run_id, slot, role = %role, "worker timed out, writing sentinel");
                        Finding::sentinel(
                            slot,
                            role,
                            format!("timed out after {}s", self.config.worker_timeout_secs),
                        )
                    }
                }
            }
        });

        // Stage 3: join barrier. All slots settle before anything downstream
        // observes the record.
        let findings = join_all(futures).await;

        // Stage 4: slot-ordered merge, cardinality always exactly N.
        let record = CaseRecord::from_settled(plan, findings);

        // Stage 5: consensus, single-threaded over the complete record.
        let consensus = ConsensusAggregator::new()
            .with_drop_weak_low(self.config.drop_weak_low_findings)
            .aggregate(&record);
        tracing::info!(
            run_id = %ctx.run_id,
            total = consensus.tally.total,
            high = consensus.tally.high,
            "consensus complete"
        );

        // Stage 6: decision.
        let mut judge = Judge::new(self.client.clone(), &self.config.judge_model);
        if let Some(sink) = &self.sink {
            judge = judge.with_sink(sink.clone());
        }
        let verdict = judge.decide(&request, &record, &consensus, &ctx).await?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(run_id = %ctx.run_id, elapsed_ms, "investigation complete");

        Ok(InvestigationReport {
            run_id: ctx.run_id,
            record,
            consensus,
            verdict,
            generation_calls: ctx.generation_calls(),
            elapsed_ms,
        })
    }
}
