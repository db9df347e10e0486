//! Best-effort persistence of training examples
//!
//! Each completed run can be recorded as a {inputs, outputs} example for
//! offline training corpora. The sink is a fire-and-forget side channel:
//! failures are logged by the caller and never join the main result path.

use crate::error::{Error, Result};
use crate::types::{Finding, RunId, Verdict};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// One {inputs, outputs} record for a training corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingExample {
    /// Run that produced this example
    pub run_id: RunId,
    /// When the example was recorded
    pub recorded_at: DateTime<Utc>,
    /// Investigation query
    pub query: String,
    /// Narrative plan the run executed against
    pub plan: String,
    /// All slot findings
    pub findings: Vec<Finding>,
    /// Final verdict
    pub verdict: Verdict,
}

/// Accepts training examples, best-effort
#[async_trait]
pub trait ExampleSink: Send + Sync {
    /// Persist one example
    async fn record(&self, example: &TrainingExample) -> Result<()>;
}

/// Sink that appends examples to a JSON-lines file
pub struct JsonlExampleSink {
    path: PathBuf,
}

impl JsonlExampleSink {
    /// Create a sink appending to the given path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ExampleSink for JsonlExampleSink {
    async fn record(&self, example: &TrainingExample) -> Result<()> {
        let mut line = serde_json::to_string(example)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::sink(format!("cannot open {}: {}", self.path.display(), e)))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| Error::sink(format!("write to {} failed: {}", self.path.display(), e)))?;
        file.flush()
            .await
            .map_err(|e| Error::sink(format!("flush of {} failed: {}", self.path.display(), e)))?;

        Ok(())
    }
}
