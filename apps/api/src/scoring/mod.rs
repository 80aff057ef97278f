//! Scoring collaborator boundary.
//!
//! The pipeline hands the scorer the uploaded document plus a fully formed
//! instruction text and gets raw model output back. Parsing and validating
//! that output is the pipeline's job, not the scorer's — a scorer returning
//! garbage must never reach the durable store.

use async_trait::async_trait;
use bytes::Bytes;

pub mod llm;
pub mod prompts;

pub use llm::{LlmError, LlmScorer};

/// The uploaded document as the scorer sees it: its durable locator plus the
/// already-fetched bytes.
pub struct ScoreSource<'a> {
    pub path: &'a str,
    pub bytes: &'a Bytes,
}

#[async_trait]
pub trait Scorer: Send + Sync {
    /// Scores a document against the given instructions, returning the raw
    /// model response text.
    async fn score(
        &self,
        source: &ScoreSource<'_>,
        instructions: &str,
    ) -> Result<String, LlmError>;
}
