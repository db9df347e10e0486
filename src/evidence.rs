//! Evidence source collaborators
//!
//! The pipeline treats evidence as an opaque, size-bounded text blob. This
//! module supplies it: a source reads raw telemetry and hands back a
//! formatted sample. A read failure is fatal to the run, since no meaningful
//! analysis is possible without evidence.

use crate::error::{Error, Result};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use rand_core::{OsRng, RngCore};
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Supplies the evidence payload for an investigation
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    /// Read and sample the evidence, returning a formatted text blob
    async fn read(&self) -> Result<String>;

    /// Human-readable description of where the evidence comes from
    fn describe(&self) -> String;
}

/// Evidence source over a JSON-lines log export, plain or gzip-compressed
///
/// Keeps a uniform random sample of at most `max_events` events (reservoir
/// sampling, so a plain file is read in one pass regardless of size) and
/// renders the sample as pretty-printed JSON for analyst prompts. Paths
/// ending in `.gz` are decompressed before line-splitting, matching how SIEM
/// platforms ship their exports.
pub struct JsonlEvidenceSource {
    path: PathBuf,
    max_events: usize,
}

impl JsonlEvidenceSource {
    /// Create a source for the given file path
    pub fn new(path: impl AsRef<Path>, max_events: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_events: max_events.max(1),
        }
    }

    fn is_gzipped(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
    }
}

/// One-pass uniform sampler over JSONL lines (Algorithm R)
struct Reservoir {
    events: Vec<serde_json::Value>,
    max_events: usize,
    total: u64,
    skipped: u64,
    rng: OsRng,
}

impl Reservoir {
    fn new(max_events: usize) -> Self {
        Self {
            events: Vec::with_capacity(max_events),
            max_events,
            total: 0,
            skipped: 0,
            rng: OsRng,
        }
    }

    fn offer(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let event: serde_json::Value = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(_) => {
                self.skipped += 1;
                tracing::warn!(line = %line.chars().take(100).collect::<String>(), "skipping unparseable evidence line");
                return;
            }
        };
        self.total += 1;

        // The first max_events fill the reservoir, later events replace a
        // random entry with probability max_events/total.
        if self.events.len() < self.max_events {
            self.events.push(event);
        } else {
            let j = self.rng.next_u64() % self.total;
            if (j as usize) < self.max_events {
                self.events[j as usize] = event;
            }
        }
    }

    fn render(self, path: &Path) -> Result<String> {
        if self.events.is_empty() {
            return Err(Error::evidence(format!(
                "{} contained no parseable events",
                path.display()
            )));
        }

        tracing::info!(
            total_events = self.total,
            sampled = self.events.len(),
            skipped_lines = self.skipped,
            "sampled evidence"
        );

        Ok(serde_json::to_string_pretty(&self.events)?)
    }
}

#[async_trait]
impl EvidenceSource for JsonlEvidenceSource {
    async fn read(&self) -> Result<String> {
        let mut reservoir = Reservoir::new(self.max_events);

        if self.is_gzipped() {
            let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
                Error::evidence(format!("cannot open {}: {}", self.path.display(), e))
            })?;
            let mut text = String::new();
            GzDecoder::new(bytes.as_slice())
                .read_to_string(&mut text)
                .map_err(|e| {
                    Error::evidence(format!(
                        "cannot decompress {}: {}",
                        self.path.display(),
                        e
                    ))
                })?;
            for line in text.lines() {
                reservoir.offer(line);
            }
        } else {
            let file = File::open(&self.path).await.map_err(|e| {
                Error::evidence(format!("cannot open {}: {}", self.path.display(), e))
            })?;
            let mut lines = BufReader::new(file).lines();
            while let Some(line) = lines.next_line().await.map_err(|e| {
                Error::evidence(format!("read error in {}: {}", self.path.display(), e))
            })? {
                reservoir.offer(&line);
            }
        }

        reservoir.render(&self.path)
    }

    fn describe(&self) -> String {
        format!("jsonl:{}", self.path.display())
    }
}

/// Evidence already in memory, for tests and embedding callers
pub struct StaticEvidence(pub String);

#[async_trait]
impl EvidenceSource for StaticEvidence {
    async fn read(&self) -> Result<String> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}
