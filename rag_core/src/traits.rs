//! Capability seams that concrete providers implement and the
//! pipeline/agent/executor depend on only through these traits.
//!
//! One narrow `#[async_trait]` per collaborator, implemented for real
//! backends in `rag_providers` and for fakes in this crate's own test
//! modules.

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{AgentDecision, EmbeddingVector, KnowledgeChunk, SearchResult};

/// Maps text to a fixed-dimension embedding vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> CoreResult<EmbeddingVector>;
}

/// Collection lifecycle, upsert, kNN search, scroll, delete.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotent: creates the collection with cosine distance if absent;
    /// no-op if present with a matching schema; `CoreError::SchemaMismatch`
    /// if present with a different one.
    async fn ensure_collection(&self, name: &str, dim: usize) -> CoreResult<()>;

    /// Upsert by id with "wait for index" semantics: does not return until
    /// the written points are searchable.
    async fn upsert(&self, name: &str, items: &[KnowledgeChunk]) -> CoreResult<()>;

    /// Top-k by cosine similarity.
    async fn search(
        &self,
        name: &str,
        vector: &EmbeddingVector,
        k: usize,
    ) -> CoreResult<Vec<SearchResult>>;

    /// Paginated listing. Excludes the vector payload.
    async fn scroll(&self, name: &str, limit: usize) -> CoreResult<Vec<KnowledgeChunk>>;

    /// Delete by id set, with "wait" semantics.
    async fn delete(&self, name: &str, ids: &[String]) -> CoreResult<()>;
}

/// Result of a `LocalLlmClient::health` probe.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub available: bool,
    pub models: Vec<String>,
    pub error: Option<String>,
}

/// Structured-output inference against a local model runtime.
#[async_trait]
pub trait LocalLlmClient: Send + Sync {
    /// 5-second hard timeout. Distinguishes "runtime unreachable" from
    /// "model missing" — model presence is matched by name prefix before
    /// `:`, so `model:3b` and `model:3b-latest` both satisfy a `model:3b`
    /// request.
    async fn health(&self, model: &str) -> HealthStatus;

    /// 30-second hard timeout, temperature 0, bounded output tokens. Must
    /// never raise: on parse failure or timeout it returns
    /// `AgentDecision::safe_fallback`.
    async fn chat(
        &self,
        model: &str,
        system_prompt: &str,
        user_message: &str,
        original_query: &str,
    ) -> AgentDecision;

    /// A focused, single-word-output call used by the memory consolidator's
    /// contradiction check. Returns the raw model text; any transport error
    /// is the caller's to interpret (the consolidator treats it as
    /// fail-safe `false`).
    async fn complete_one_word(&self, model: &str, prompt: &str) -> CoreResult<String>;
}
