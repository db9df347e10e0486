//! End-to-end investigation example over a JSONL log export

use inquest::prelude::*;
use inquest::sink::JsonlExampleSink;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("=== Inquest Investigation Example ===\n");

    // Create OpenRouter client
    let client = OpenRouterClient::from_env()?;
    println!("✓ OpenRouter client initialized");

    let log_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "events.jsonl".to_string());
    let query = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "Is there evidence of lateral movement or credential theft?".to_string());

    let config = PipelineConfig::default();
    let executor = GraphExecutor::new(Arc::new(client), config)
        .with_sink(Arc::new(JsonlExampleSink::new("training_examples.jsonl")));

    let source = JsonlEvidenceSource::new(&log_path, 50);
    println!("✓ Evidence source: {}", log_path);
    println!("\n Query: {}", query);
    println!("\n🔍 Investigating...\n");

    match executor.investigate(query, &source).await {
        Ok(report) => {
            println!("✅ Investigation {} completed\n", report.run_id);

            println!("📋 Plan: {}\n", report.record.plan.narrative);
            for finding in report.record.findings() {
                let status = if finding.is_sentinel() { "✗" } else { "✓" };
                println!(
                    "  {} slot {} ({}): {} chars",
                    status,
                    finding.slot,
                    finding.source_role,
                    finding.raw_text.len()
                );
            }

            println!("\n🗳 Consensus findings:");
            for scored in &report.consensus.findings {
                println!(
                    "  - [{} / {} specialist(s)] {}",
                    scored.tier, scored.corroboration_count, scored.description
                );
            }

            println!("\n⚖ Verdict: {}", report.verdict.statement);
            println!("\nSummary: {}", report.verdict.summary);
            if !report.verdict.remediation_commands.is_empty() {
                println!("\nRemediation:");
                for command in &report.verdict.remediation_commands {
                    println!("  $ {}", command);
                }
            }

            println!("\n📊 Statistics:");
            println!("  - Generation calls: {}", report.generation_calls);
            println!("  - Elapsed: {} ms", report.elapsed_ms);
            println!(
                "  - Findings: {} total, {} high confidence",
                report.consensus.tally.total, report.consensus.tally.high
            );
        }
        Err(e) => {
            eprintln!("❌ Investigation failed: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
