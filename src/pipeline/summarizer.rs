//! Seam to the external text-generation service.
//!
//! The service is unreliable by contract: calls may fail or hang, and the
//! worker wraps every call in a timeout. Errors split into transient
//! (retried up to the attempt ceiling) and permanent (terminal
//! immediately).

use crate::ProfileKind;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Context handed to the generation service for one profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub name: String,
    pub qualified_name: String,
    pub kind: ProfileKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    /// Source excerpt, truncated to the configured character cap. Empty
    /// for directory aggregation requests.
    pub code_excerpt: String,
    /// Summaries of immediate call neighbors (or of children, for
    /// directories) that are already available.
    pub neighbor_summaries: Vec<String>,
}

#[derive(Error, Debug)]
pub enum SummarizeError {
    /// Worth retrying: rate limits, connection resets, service hiccups.
    #[error("transient generation failure: {0}")]
    Transient(String),

    /// Retries will not help: rejected input, misconfiguration.
    #[error("permanent generation failure: {0}")]
    Permanent(String),
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<String, SummarizeError>;
}
