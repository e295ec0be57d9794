//! Core data model: embeddings, knowledge chunks, search results, and the
//! structured verdict the decision agent produces for a user turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A unit-norm, cosine-ready embedding vector. The dimension must match the
/// vector-store collection schema; this type does not enforce a fixed `D`
/// since that is a deployment-time constant (embedding model choice), not a
/// compile-time one.
pub type EmbeddingVector = Vec<f32>;

/// A cosine-similarity score, always in `[0, 1]`.
///
/// Wrapping the raw `f64` gives the multi-query executor and the memory
/// consolidator a single `Ord`-compatible comparator (`f64` alone is only
/// `PartialOrd`), instead of each call site writing its own
/// `partial_cmp(...).unwrap_or(Ordering::Equal)`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Score(pub f64);

impl Score {
    #[must_use]
    pub fn clamped(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }
}

impl Eq for Score {}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// The source format a `KnowledgeChunk` was ingested from: `pdf`, `md`,
/// `txt`, `url`, `notion`, or `memory:<category>` for rows produced by the
/// consolidator. Modeled as a newtype rather than a closed enum because the
/// `memory:*` family is open-ended on the category name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkType(String);

impl ChunkType {
    #[must_use]
    pub fn pdf() -> Self {
        Self("pdf".to_string())
    }
    #[must_use]
    pub fn md() -> Self {
        Self("md".to_string())
    }
    #[must_use]
    pub fn txt() -> Self {
        Self("txt".to_string())
    }
    #[must_use]
    pub fn url() -> Self {
        Self("url".to_string())
    }
    #[must_use]
    pub fn notion() -> Self {
        Self("notion".to_string())
    }
    #[must_use]
    pub fn memory(category: &str) -> Self {
        Self(format!("memory:{category}"))
    }

    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.0.starts_with("memory:")
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Metadata attached to every `KnowledgeChunk`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,
    pub chunk_index: u32,
    pub total_chunks: u32,
    pub date_added: DateTime<Utc>,
    /// Only populated for `memory:*` rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Only populated for `memory:*` rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
}

/// The atomic retrievable unit stored in the vector collection.
///
/// Invariant: `(metadata.source, metadata.chunk_index)` is unique within a
/// collection; `0 <= chunk_index < total_chunks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Not present on listing operations (`scroll`); only on ingestion and
    /// direct fetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<EmbeddingVector>,
}

/// A single hit returned from a vector-store `search` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Cosine similarity, `[0, 1]`, higher is more similar.
    pub score: f64,
}

/// The query-fan-out strategy the decision agent selects for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStrategy {
    /// A single, specific query.
    Direct,
    /// 2-3 paraphrases to widen recall on ambiguous phrasing.
    MultiPerspective,
    /// A compound query split into independently-searchable parts.
    Decomposed,
}

/// The structured verdict produced by the RAG decision agent for a single
/// user turn. Ephemeral: never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDecision {
    pub needs_retrieval: bool,
    /// One sentence explaining the verdict.
    pub reasoning: String,
    /// Length 0-3; empty iff `!needs_retrieval`.
    pub search_queries: Vec<String>,
    pub query_strategy: QueryStrategy,
    /// The user's turn with self-referential phrasing ("my notes", "what I
    /// uploaded") stripped, so the upstream LLM doesn't attempt a second
    /// retrieval. Equal to the original when nothing needed stripping.
    pub cleaned_query: String,
    /// Set when this decision is standing in for a collaborator failure
    /// (model runtime unreachable, response unparseable, timed out) rather
    /// than a genuine "no retrieval needed" verdict. `process_rag_query`
    /// uses this to populate `RagQueryOutcome::error` and emit
    /// `RagEvent::Error` without the local LLM client needing to return a
    /// `Result` it would otherwise have to fabricate an `Ok` around.
    pub failed: bool,
}

impl AgentDecision {
    /// The fallback used whenever the local LLM call fails to parse, times
    /// out, or the runtime is unreachable. Retrieval is an optimization;
    /// this must never be replaced by a raised error. Marks `failed` so the
    /// pipeline can surface the cause as telemetry instead of silently
    /// treating it as an ordinary skip.
    #[must_use]
    pub fn safe_fallback(cause: impl Into<String>, original_query: &str) -> Self {
        Self {
            needs_retrieval: false,
            reasoning: cause.into(),
            search_queries: Vec::new(),
            query_strategy: QueryStrategy::Direct,
            cleaned_query: original_query.to_string(),
            failed: true,
        }
    }

    /// A deliberate "no retrieval needed" decision that is not a failure:
    /// the feature is disabled, or (in tests) a fake standing in for a
    /// model that genuinely decided retrieval wasn't warranted.
    #[must_use]
    pub fn skip(reason: impl Into<String>, original_query: &str) -> Self {
        Self {
            needs_retrieval: false,
            reasoning: reason.into(),
            search_queries: Vec::new(),
            query_strategy: QueryStrategy::Direct,
            cleaned_query: original_query.to_string(),
            failed: false,
        }
    }
}

/// A ranked, flattened context entry ready for prompt formatting. Produced
/// by the multi-query executor, consumed by the context formatter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedContext {
    pub content: String,
    pub source: String,
    pub score: f64,
    /// Carried through for dedup-by-id in the executor; not part of the
    /// rendered prompt.
    pub id: String,
}
