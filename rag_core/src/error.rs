//! Shared error taxonomy for the retrieval/memory core.
//!
//! Every collaborator-facing trait (`EmbeddingProvider`, `VectorStore`,
//! `LocalLlmClient`, `MemoryRepo`) returns `Result<_, CoreError>` rather than
//! `anyhow::Error` so call sites can match on the kind instead of string
//! sniffing. `anyhow` stays at the binary boundary (see `rag_cli`).

use thiserror::Error;

/// Error kinds surfaced by the core. Kinds, not type names: callers branch
/// on the variant, not on which component produced it.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Missing or invalid settings. Surfaced, never retried.
    #[error("config error: {0}")]
    Config(String),

    /// Local LLM runtime or vector store unreachable. The RAG path
    /// degrades to "no context"; memory consolidation degrades to "store".
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Web session not logged in, or its cookies expired mid-flight.
    #[error("auth error: {0}")]
    Auth(String),

    /// Upstream rate limit (HTTP 429). No auto-retry; backoff is the
    /// caller's decision.
    #[error("rate limited")]
    RateLimit,

    /// Unexpected wire format. Best-effort extraction still returns
    /// partial results where that is possible; this variant is for the
    /// cases where nothing at all could be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A hard per-call deadline elapsed.
    #[error("timeout: {0}")]
    Timeout(String),

    /// A vector-store collection exists with a different schema than the
    /// one requested by `ensure_collection`.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
}

impl CoreError {
    /// Maps a timeout to `Unavailable`, matching the RAG-path convention
    /// that every upstream failure becomes "no retrieval", not a distinct
    /// timeout branch the caller has to special-case.
    #[must_use]
    pub fn into_unavailable(self) -> Self {
        match self {
            Self::Timeout(msg) => Self::Unavailable(msg),
            other => other,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
