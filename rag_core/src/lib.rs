#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

pub mod agent;
pub mod error;
pub mod events;
pub mod memory;
pub mod pipeline;
pub mod retrieval;
pub mod settings;
pub mod traits;
pub mod types;

pub use agent::{strip_self_referential, RagAgent};
pub use error::{CoreError, CoreResult};
pub use events::RagEvent;
pub use memory::{
    ConsolidationAction, ConsolidationResult, Memory, MemoryCategory, MemoryRepo, SourceType,
    DEFAULT_TEMPORAL_TTL,
};
pub use pipeline::{process_rag_query, process_rag_query_as_prompt, RagQueryOutcome};
pub use retrieval::{format_context_for_prompt, MultiQueryExecutor};
pub use settings::{KnowledgeSettings, MemorySettings, RagSettings, WebSessionSettings};
pub use traits::{EmbeddingProvider, HealthStatus, LocalLlmClient, VectorStore};
pub use types::{
    AgentDecision, ChunkMetadata, ChunkType, EmbeddingVector, KnowledgeChunk, QueryStrategy,
    RankedContext, Score, SearchResult,
};
