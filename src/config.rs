//! Configuration types for the investigation pipeline

use crate::error::{Error, Result};
use dotenvy::dotenv;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// OpenRouter client configuration
#[derive(Clone)]
pub struct OpenRouterConfig {
    /// API key (loaded from environment variable)
    pub api_key: SecretString,
    /// Base URL for OpenRouter API
    pub base_url: Url,
    /// Request timeout
    pub timeout: Duration,
    /// App name for OpenRouter tracking
    pub app_name: String,
}

impl OpenRouterConfig {
    /// Create a new OpenRouter configuration from environment
    pub fn from_env() -> Result<Self> {
        // Load .env if present so local development picks up OPENROUTER_API_KEY
        let _ = dotenv();

        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| Error::config("OPENROUTER_API_KEY environment variable not set"))?;

        Ok(Self::new(api_key))
    }

    /// Create a new OpenRouter configuration with a specific API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: Url::parse("https://openrouter.ai/api/v1").expect("valid OpenRouter URL"),
            timeout: Duration::from_secs(120),
            app_name: "inquest log investigation".to_string(),
        }
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the app name
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Get the API key as a string
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

impl std::fmt::Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterConfig")
            .field("api_key", &"***REDACTED***")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("app_name", &self.app_name)
            .finish()
    }
}

/// Pipeline configuration, loadable from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of parallel worker slots
    #[serde(default = "default_worker_slots")]
    pub worker_slots: usize,
    /// Bounded retries for the planning stage before the run fails
    #[serde(default = "default_plan_retries")]
    pub max_plan_retries: u32,
    /// Per-worker wall-clock budget in seconds; timed-out slots get sentinels
    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: u64,
    /// Maximum events sampled from the evidence source
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Cap on evidence characters handed to each worker prompt
    #[serde(default = "default_evidence_char_cap")]
    pub evidence_char_cap: usize,
    /// Drop Low-tier findings that carry no concrete identifier.
    /// Dropped findings are still surfaced in the tally.
    #[serde(default)]
    pub drop_weak_low_findings: bool,
    /// Model for the planning stage
    #[serde(default = "default_model")]
    pub planner_model: String,
    /// Model for worker analysis
    #[serde(default = "default_model")]
    pub worker_model: String,
    /// Model for the decision stage
    #[serde(default = "default_model")]
    pub judge_model: String,
}

fn default_worker_slots() -> usize {
    5
}
fn default_plan_retries() -> u32 {
    2
}
fn default_worker_timeout_secs() -> u64 {
    180
}
fn default_max_events() -> usize {
    50
}
fn default_evidence_char_cap() -> usize {
    10_000
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_slots: default_worker_slots(),
            max_plan_retries: default_plan_retries(),
            worker_timeout_secs: default_worker_timeout_secs(),
            max_events: default_max_events(),
            evidence_char_cap: default_evidence_char_cap(),
            drop_weak_low_findings: false,
            planner_model: default_model(),
            worker_model: default_model(),
            judge_model: default_model(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("Failed to parse YAML: {}", e)))
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read file: {}", e)))?;
        Self::from_yaml(&content)
    }

    /// Worker timeout as a [`Duration`]
    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pipeline_config() {
        let yaml = r#"
worker_slots: 3
max_plan_retries: 1
worker_timeout_secs: 60
drop_weak_low_findings: true
worker_model: "anthropic/claude-haiku-4"
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.worker_slots, 3);
        assert_eq!(config.max_plan_retries, 1);
        assert_eq!(config.worker_timeout(), Duration::from_secs(60));
        assert!(config.drop_weak_low_findings);
        assert_eq!(config.worker_model, "anthropic/claude-haiku-4");
        // Unset fields take defaults
        assert_eq!(config.max_events, 50);
        assert_eq!(config.evidence_char_cap, 10_000);
    }

    #[test]
    fn test_defaults_match_fixed_topology() {
        let config = PipelineConfig::default();
        assert_eq!(config.worker_slots, 5);
        assert!(!config.drop_weak_low_findings);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = OpenRouterConfig::new("super-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
