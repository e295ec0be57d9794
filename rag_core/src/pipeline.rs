//! Orchestrates a single query through decide → fan-out search → format,
//! emitting progress events as it goes. This is the top-level entry point
//! the desktop shell calls once per user turn.

use std::time::Instant;

use tokio::sync::mpsc::UnboundedSender;
use tracing::error;

use crate::agent::RagAgent;
use crate::events::RagEvent;
use crate::retrieval::{format_context_for_prompt, MultiQueryExecutor};
use crate::settings::RagSettings;
use crate::types::{AgentDecision, RankedContext};

/// Result of a single `process_rag_query` call.
#[derive(Debug, Clone)]
pub struct RagQueryOutcome {
    pub decision: AgentDecision,
    pub contexts: Vec<RankedContext>,
    pub processing_time_ms: u64,
    /// Set only when the pipeline degraded to "no context" due to an
    /// internal failure; the caller still gets a usable outcome.
    pub error: Option<String>,
}

/// Drives the full retrieval path for one user turn. Never returns an
/// `Err` — every internal failure degrades to "no context" (fail-open),
/// with the cause recorded on `RagQueryOutcome::error` and an `Error`
/// event emitted alongside `Skipped`/`Complete`.
pub async fn process_rag_query(
    agent: &RagAgent,
    executor: &MultiQueryExecutor,
    user_text: &str,
    collection_name: &str,
    settings: &RagSettings,
    events: &UnboundedSender<RagEvent>,
) -> RagQueryOutcome {
    let start = Instant::now();
    let _ = events.send(RagEvent::AgentThinking);

    if !settings.enabled {
        let _ = events.send(RagEvent::Skipped);
        return RagQueryOutcome {
            decision: AgentDecision::skip("rag disabled", user_text),
            contexts: Vec::new(),
            processing_time_ms: elapsed_ms(start),
            error: None,
        };
    }

    let decision = agent.decide(user_text).await;

    if !decision.needs_retrieval {
        let error = if decision.failed {
            let _ = events.send(RagEvent::Error { message: decision.reasoning.clone() });
            Some(decision.reasoning.clone())
        } else {
            let _ = events.send(RagEvent::Skipped);
            None
        };
        return RagQueryOutcome {
            decision,
            contexts: Vec::new(),
            processing_time_ms: elapsed_ms(start),
            error,
        };
    }

    let _ = events.send(RagEvent::Searching);

    let contexts = executor
        .execute(&decision.search_queries, collection_name, settings)
        .await;

    let processing_time_ms = elapsed_ms(start);
    let _ = events.send(RagEvent::Complete {
        queries_generated: decision.search_queries.len(),
        chunks_retrieved: contexts.len(),
        processing_time_ms,
    });

    RagQueryOutcome {
        decision,
        contexts,
        processing_time_ms,
        error: None,
    }
}

/// Convenience wrapper pairing `process_rag_query`'s contexts with
/// `format_context_for_prompt`, for callers that only want the finished
/// prompt fragment rather than the ranked list.
pub async fn process_rag_query_as_prompt(
    agent: &RagAgent,
    executor: &MultiQueryExecutor,
    user_text: &str,
    collection_name: &str,
    settings: &RagSettings,
    events: &UnboundedSender<RagEvent>,
) -> (RagQueryOutcome, String) {
    let outcome = process_rag_query(
        agent,
        executor,
        user_text,
        collection_name,
        settings,
        events,
    )
    .await;
    let prompt_fragment = format_context_for_prompt(&outcome.contexts);
    (outcome, prompt_fragment)
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or_else(|err| {
        error!(error = %err, "processing time overflowed u64 millis, clamping");
        u64::MAX
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::mpsc::unbounded_channel;

    use crate::error::CoreResult;
    use crate::traits::{EmbeddingProvider, HealthStatus, LocalLlmClient, VectorStore};
    use crate::types::{ChunkMetadata, ChunkType, EmbeddingVector, KnowledgeChunk, QueryStrategy, SearchResult};
    use chrono::Utc;

    struct FakeClient {
        decision: AgentDecision,
    }

    #[async_trait]
    impl LocalLlmClient for FakeClient {
        async fn health(&self, _model: &str) -> HealthStatus {
            HealthStatus { available: true, models: vec![], error: None }
        }
        async fn chat(&self, _model: &str, _system: &str, _user: &str, _original: &str) -> AgentDecision {
            self.decision.clone()
        }
        async fn complete_one_word(&self, _model: &str, _prompt: &str) -> CoreResult<String> {
            Ok("COMPATIBLE".to_string())
        }
    }

    struct FakeEmbedder;
    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed(&self, _text: &str) -> CoreResult<EmbeddingVector> {
            Ok(vec![1.0, 0.0])
        }
    }

    struct FakeStore;
    #[async_trait]
    impl VectorStore for FakeStore {
        async fn ensure_collection(&self, _name: &str, _dim: usize) -> CoreResult<()> { Ok(()) }
        async fn upsert(&self, _name: &str, _items: &[KnowledgeChunk]) -> CoreResult<()> { Ok(()) }
        async fn search(&self, _name: &str, _vector: &EmbeddingVector, _k: usize) -> CoreResult<Vec<SearchResult>> {
            Ok(vec![SearchResult {
                id: "c1".to_string(),
                content: "relevant content".to_string(),
                metadata: ChunkMetadata {
                    source: "notes.md".to_string(),
                    filename: "notes.md".to_string(),
                    chunk_type: ChunkType::md(),
                    chunk_index: 0,
                    total_chunks: 1,
                    date_added: Utc::now(),
                    category: None,
                    importance: None,
                },
                score: 0.9,
            }])
        }
        async fn scroll(&self, _name: &str, _limit: usize) -> CoreResult<Vec<KnowledgeChunk>> { Ok(Vec::new()) }
        async fn delete(&self, _name: &str, _ids: &[String]) -> CoreResult<()> { Ok(()) }
    }

    #[tokio::test]
    async fn skips_when_agent_says_no_retrieval_needed() {
        let client = Arc::new(FakeClient {
            decision: AgentDecision::skip("general knowledge", "what is rust?"),
        });
        let agent = RagAgent::new(client, "qwen2.5:3b");
        let executor = MultiQueryExecutor::new(Arc::new(FakeEmbedder), Arc::new(FakeStore));
        let settings = RagSettings::default();
        let (tx, mut rx) = unbounded_channel();

        let outcome = process_rag_query(&agent, &executor, "what is rust?", "kb", &settings, &tx).await;
        assert!(outcome.contexts.is_empty());
        assert!(outcome.error.is_none());

        let mut saw_skipped = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, RagEvent::Skipped) {
                saw_skipped = true;
            }
        }
        assert!(saw_skipped);
    }

    #[tokio::test]
    async fn failed_decision_populates_error_and_emits_error_event() {
        let client = Arc::new(FakeClient {
            decision: AgentDecision::safe_fallback("local model runtime unreachable", "what is rust?"),
        });
        let agent = RagAgent::new(client, "qwen2.5:3b");
        let executor = MultiQueryExecutor::new(Arc::new(FakeEmbedder), Arc::new(FakeStore));
        let settings = RagSettings::default();
        let (tx, mut rx) = unbounded_channel();

        let outcome = process_rag_query(&agent, &executor, "what is rust?", "kb", &settings, &tx).await;
        assert!(outcome.contexts.is_empty());
        assert_eq!(outcome.error.as_deref(), Some("local model runtime unreachable"));

        let mut saw_error_event = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, RagEvent::Error { .. }) {
                saw_error_event = true;
            }
        }
        assert!(saw_error_event);
    }

    #[tokio::test]
    async fn retrieves_and_emits_complete() {
        let client = Arc::new(FakeClient {
            decision: AgentDecision {
                needs_retrieval: true,
                reasoning: "needs notes".to_string(),
                search_queries: vec!["quarterly roadmap".to_string()],
                query_strategy: QueryStrategy::Direct,
                cleaned_query: "what's the roadmap?".to_string(),
                failed: false,
            },
        });
        let agent = RagAgent::new(client, "qwen2.5:3b");
        let executor = MultiQueryExecutor::new(Arc::new(FakeEmbedder), Arc::new(FakeStore));
        let settings = RagSettings::default();
        let (tx, mut rx) = unbounded_channel();

        let outcome = process_rag_query(&agent, &executor, "what's the roadmap according to my notes?", "kb", &settings, &tx).await;
        assert_eq!(outcome.contexts.len(), 1);

        let mut saw_complete = false;
        while let Ok(event) = rx.try_recv() {
            if let RagEvent::Complete { chunks_retrieved, .. } = event {
                assert_eq!(chunks_retrieved, 1);
                saw_complete = true;
            }
        }
        assert!(saw_complete);
    }

    #[tokio::test]
    async fn disabled_settings_short_circuits_before_agent_call() {
        let client = Arc::new(FakeClient {
            decision: AgentDecision::skip("n/a", "q"),
        });
        let agent = RagAgent::new(client, "qwen2.5:3b");
        let executor = MultiQueryExecutor::new(Arc::new(FakeEmbedder), Arc::new(FakeStore));
        let mut settings = RagSettings::default();
        settings.enabled = false;
        let (tx, _rx) = unbounded_channel();

        let outcome = process_rag_query(&agent, &executor, "q", "kb", &settings, &tx).await;
        assert!(outcome.contexts.is_empty());
        assert!(!outcome.decision.needs_retrieval);
    }
}
