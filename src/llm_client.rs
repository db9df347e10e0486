//! Unified client trait for the text-generation collaborator
//!
//! The pipeline never interprets generation internals; it only depends on
//! this contract: messages in, text out, fallible.

use crate::error::Result;
use crate::openrouter::{CompletionRequest, CompletionResponse};
use async_trait::async_trait;

/// Trait for text-generation backends
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a completion request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the client type for debugging/logging
    fn client_type(&self) -> &str;

    /// Get the endpoint this client talks to
    fn endpoint(&self) -> &str;
}
