//! The memory consolidation state machine: decides whether a candidate
//! fact should be stored, skipped as a duplicate, or superseded against
//! the most similar active memory already on file.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rag_core::{
    ConsolidationAction, ConsolidationResult, CoreError, LocalLlmClient, Memory, MemoryCategory,
    MemoryRepo, SourceType, VectorStore,
};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Below this similarity to every active memory, the candidate is novel
/// and gets stored outright.
pub const SKIP_THRESHOLD: f64 = 0.70;

/// At or above this similarity, the candidate is treated as a duplicate of
/// the nearest active memory and dropped (its access is boosted instead).
pub const DUPLICATE_THRESHOLD: f64 = 0.85;

const CONTRADICTION_MODEL_MARKER: &str = "CONTRADICTION";

pub struct MemoryConsolidator {
    repo: Arc<dyn MemoryRepo>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LocalLlmClient>,
    model: String,
    collection_name: String,
    /// Serializes consolidation per user/scope so two concurrent calls for
    /// the same user cannot both decide "novel" against the same gap and
    /// race each other into duplicate inserts.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MemoryConsolidator {
    #[must_use]
    pub fn new(
        repo: Arc<dyn MemoryRepo>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LocalLlmClient>,
        model: impl Into<String>,
        collection_name: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            store,
            llm,
            model: model.into(),
            collection_name: collection_name.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, scope: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(
            locks
                .entry(scope.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Runs the full consolidation pass for one candidate fact and, when
    /// the verdict is `Store` or `Supersede`, performs the corresponding
    /// `MemoryRepo` write itself (the caller only needs the returned
    /// `ConsolidationResult` for logging/UI).
    ///
    /// Fails open to `Store` when the vector store is unavailable: a
    /// missed consolidation opportunity is far cheaper than losing a new
    /// fact outright.
    pub async fn consolidate(
        &self,
        scope: &str,
        content: &str,
        category: MemoryCategory,
        importance: f64,
        source_type: SourceType,
        embedding: &[f32],
    ) -> ConsolidationResult {
        let scope_lock = self.lock_for(scope).await;
        let _guard = scope_lock.lock().await;

        let candidate = Memory::new(content, category, importance, source_type, Utc::now());

        let nearest = match self
            .store
            .search(&self.collection_name, &embedding.to_vec(), 1)
            .await
        {
            Ok(results) => results.into_iter().next(),
            Err(err) => {
                warn!(%scope, error = %err, "vector search unavailable during consolidation, storing candidate");
                return self.store_candidate(candidate, "vector store unavailable").await;
            }
        };

        let Some(nearest) = nearest else {
            return self.store_candidate(candidate, "no prior memories to compare against").await;
        };

        if nearest.score < SKIP_THRESHOLD {
            return self
                .store_candidate(candidate, "below similarity threshold, treated as novel")
                .await;
        }

        let Ok(nearest_id) = Uuid::parse_str(&nearest.id) else {
            warn!(id = %nearest.id, "nearest memory id is not a valid uuid, storing candidate");
            return self.store_candidate(candidate, "nearest match had an unparseable id").await;
        };

        if nearest.score >= DUPLICATE_THRESHOLD {
            if let Err(err) = self.repo.boost_access(nearest_id, Utc::now()).await {
                warn!(%nearest_id, error = %err, "failed to boost access on duplicate match");
            }
            return ConsolidationResult {
                action: ConsolidationAction::Skip,
                existing_id: Some(nearest_id),
                reason: format!("duplicate of existing memory (similarity {:.2})", nearest.score),
            };
        }

        let candidate_category = category.to_string();
        if nearest.metadata.category.as_deref() != Some(candidate_category.as_str()) {
            return self
                .store_candidate(candidate, "similar but different category, storing without a contradiction check")
                .await;
        }

        let contradicts = self.check_contradiction(&nearest.content, content).await;

        if contradicts {
            if let Err(err) = self.repo.insert(&candidate).await {
                warn!(error = %err, "failed to insert superseding memory");
            }
            if let Err(err) = self.repo.supersede(nearest_id, candidate.id).await {
                warn!(%nearest_id, error = %err, "failed to mark existing memory superseded");
            }
            return ConsolidationResult {
                action: ConsolidationAction::Supersede,
                existing_id: Some(nearest_id),
                reason: format!("contradicts existing memory (similarity {:.2})", nearest.score),
            };
        }

        self.store_candidate(candidate, "similar but compatible with existing memory")
            .await
    }

    async fn store_candidate(&self, candidate: Memory, reason: &str) -> ConsolidationResult {
        let id = candidate.id;
        if let Err(err) = self.repo.insert(&candidate).await {
            warn!(%id, error = %err, "failed to insert new memory");
        } else {
            info!(%id, "stored new memory");
        }
        ConsolidationResult {
            action: ConsolidationAction::Store,
            existing_id: None,
            reason: reason.to_string(),
        }
    }

    /// A one-word completion deciding whether `candidate` contradicts
    /// `existing`. Fails safe to "compatible" (`false`) on any transport
    /// error, since a missed contradiction only means a slightly stale
    /// duplicate lingers, while a false positive would incorrectly
    /// supersede a still-valid memory.
    async fn check_contradiction(&self, existing: &str, candidate: &str) -> bool {
        let prompt = format!(
            "Existing memory: \"{existing}\"\nNew statement: \"{candidate}\"\n\
             Does the new statement CONTRADICT the existing memory (not merely add detail)? \
             Answer with exactly one word: CONTRADICTION or COMPATIBLE."
        );

        match self.llm.complete_one_word(&self.model, &prompt).await {
            Ok(answer) => answer.to_uppercase().contains(CONTRADICTION_MODEL_MARKER),
            Err(CoreError::Unavailable(_) | CoreError::Timeout(_)) => false,
            Err(err) => {
                warn!(error = %err, "contradiction check failed, treating as compatible");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rag_core::{
        ChunkMetadata, ChunkType, CoreResult, EmbeddingVector, HealthStatus, KnowledgeChunk,
        SearchResult,
    };
    use std::sync::Mutex as StdMutex;

    struct FakeRepo {
        inserted: StdMutex<Vec<Memory>>,
        superseded: StdMutex<Vec<(Uuid, Uuid)>>,
        boosted: StdMutex<Vec<Uuid>>,
    }

    impl FakeRepo {
        fn new() -> Self {
            Self {
                inserted: StdMutex::new(Vec::new()),
                superseded: StdMutex::new(Vec::new()),
                boosted: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MemoryRepo for FakeRepo {
        async fn insert(&self, memory: &Memory) -> CoreResult<()> {
            self.inserted.lock().expect("lock").push(memory.clone());
            Ok(())
        }
        async fn supersede(&self, existing_id: Uuid, new_id: Uuid) -> CoreResult<()> {
            self.superseded.lock().expect("lock").push((existing_id, new_id));
            Ok(())
        }
        async fn boost_access(&self, id: Uuid, _now: chrono::DateTime<Utc>) -> CoreResult<()> {
            self.boosted.lock().expect("lock").push(id);
            Ok(())
        }
        async fn list_active(&self, _scope: &str) -> CoreResult<Vec<Memory>> {
            Ok(Vec::new())
        }
    }

    struct FakeStore {
        nearest: Option<(String, f64)>,
        nearest_category: Option<&'static str>,
    }

    fn meta(category: Option<&str>) -> ChunkMetadata {
        ChunkMetadata {
            source: "memory".to_string(),
            filename: "memory".to_string(),
            chunk_type: ChunkType::memory(category.unwrap_or("factual")),
            chunk_index: 0,
            total_chunks: 1,
            date_added: Utc::now(),
            category: category.map(str::to_string),
            importance: None,
        }
    }

    #[async_trait]
    impl VectorStore for FakeStore {
        async fn ensure_collection(&self, _name: &str, _dim: usize) -> CoreResult<()> { Ok(()) }
        async fn upsert(&self, _name: &str, _items: &[KnowledgeChunk]) -> CoreResult<()> { Ok(()) }
        async fn search(&self, _name: &str, _vector: &EmbeddingVector, _k: usize) -> CoreResult<Vec<SearchResult>> {
            Ok(self.nearest.clone().into_iter().map(|(id, score)| SearchResult {
                id,
                content: "existing memory content".to_string(),
                metadata: meta(self.nearest_category),
                score,
            }).collect())
        }
        async fn scroll(&self, _name: &str, _limit: usize) -> CoreResult<Vec<KnowledgeChunk>> { Ok(Vec::new()) }
        async fn delete(&self, _name: &str, _ids: &[String]) -> CoreResult<()> { Ok(()) }
    }

    struct FakeLlm {
        verdict: &'static str,
    }

    #[async_trait]
    impl LocalLlmClient for FakeLlm {
        async fn health(&self, _model: &str) -> HealthStatus {
            HealthStatus { available: true, models: vec![], error: None }
        }
        async fn chat(&self, _model: &str, _system: &str, _user: &str, original: &str) -> rag_core::AgentDecision {
            rag_core::AgentDecision::safe_fallback("n/a", original)
        }
        async fn complete_one_word(&self, _model: &str, _prompt: &str) -> CoreResult<String> {
            Ok(self.verdict.to_string())
        }
    }

    fn consolidator(
        nearest: Option<(String, f64)>,
        nearest_category: Option<&'static str>,
        verdict: &'static str,
    ) -> MemoryConsolidator {
        MemoryConsolidator::new(
            Arc::new(FakeRepo::new()),
            Arc::new(FakeStore { nearest, nearest_category }),
            Arc::new(FakeLlm { verdict }),
            "qwen2.5:3b",
            "knowledge_base",
        )
    }

    #[tokio::test]
    async fn novel_fact_is_stored() {
        let c = consolidator(None, None, "COMPATIBLE");
        let result = c
            .consolidate("user-1", "likes dark roast coffee", MemoryCategory::Preference, 0.6, SourceType::MainChat, &[1.0, 0.0])
            .await;
        assert_eq!(result.action, ConsolidationAction::Store);
    }

    #[tokio::test]
    async fn below_threshold_is_stored() {
        let existing_id = Uuid::now_v7();
        let c = consolidator(Some((existing_id.to_string(), 0.4)), Some("factual"), "COMPATIBLE");
        let result = c
            .consolidate("user-1", "new unrelated fact", MemoryCategory::Factual, 0.5, SourceType::MainChat, &[1.0, 0.0])
            .await;
        assert_eq!(result.action, ConsolidationAction::Store);
    }

    #[tokio::test]
    async fn high_similarity_is_skipped_as_duplicate() {
        let existing_id = Uuid::now_v7();
        let c = consolidator(Some((existing_id.to_string(), 0.91)), Some("preference"), "COMPATIBLE");
        let result = c
            .consolidate("user-1", "user likes dark roast coffee", MemoryCategory::Preference, 0.6, SourceType::MainChat, &[1.0, 0.0])
            .await;
        assert_eq!(result.action, ConsolidationAction::Skip);
        assert_eq!(result.existing_id, Some(existing_id));
    }

    #[tokio::test]
    async fn mid_range_contradiction_supersedes() {
        let existing_id = Uuid::now_v7();
        let c = consolidator(Some((existing_id.to_string(), 0.78)), Some("preference"), "CONTRADICTION");
        let result = c
            .consolidate("user-1", "user now prefers tea over coffee", MemoryCategory::Preference, 0.6, SourceType::MainChat, &[1.0, 0.0])
            .await;
        assert_eq!(result.action, ConsolidationAction::Supersede);
        assert_eq!(result.existing_id, Some(existing_id));
    }

    #[tokio::test]
    async fn mid_range_compatible_is_stored() {
        let existing_id = Uuid::now_v7();
        let c = consolidator(Some((existing_id.to_string(), 0.78)), Some("preference"), "COMPATIBLE");
        let result = c
            .consolidate("user-1", "user also likes green tea", MemoryCategory::Preference, 0.6, SourceType::MainChat, &[1.0, 0.0])
            .await;
        assert_eq!(result.action, ConsolidationAction::Store);
    }

    #[tokio::test]
    async fn mid_range_differing_category_is_stored_without_contradiction_check() {
        let existing_id = Uuid::now_v7();
        // Nearest is a `preference` memory; candidate is `factual`. Even
        // though the LLM verdict below is rigged to say CONTRADICTION, a
        // differing category must short-circuit to `store` before the
        // contradiction check ever runs.
        let c = consolidator(Some((existing_id.to_string(), 0.78)), Some("preference"), "CONTRADICTION");
        let result = c
            .consolidate("user-1", "the user's timezone is UTC+1", MemoryCategory::Factual, 0.6, SourceType::MainChat, &[1.0, 0.0])
            .await;
        assert_eq!(result.action, ConsolidationAction::Store);
        assert_eq!(result.existing_id, None);
    }

    struct FailingStore;
    #[async_trait]
    impl VectorStore for FailingStore {
        async fn ensure_collection(&self, _name: &str, _dim: usize) -> CoreResult<()> { Ok(()) }
        async fn upsert(&self, _name: &str, _items: &[KnowledgeChunk]) -> CoreResult<()> { Ok(()) }
        async fn search(&self, _name: &str, _vector: &EmbeddingVector, _k: usize) -> CoreResult<Vec<SearchResult>> {
            Err(CoreError::Unavailable("qdrant down".to_string()))
        }
        async fn scroll(&self, _name: &str, _limit: usize) -> CoreResult<Vec<KnowledgeChunk>> { Ok(Vec::new()) }
        async fn delete(&self, _name: &str, _ids: &[String]) -> CoreResult<()> { Ok(()) }
    }

    #[tokio::test]
    async fn vector_store_failure_fails_open_to_store() {
        let c = MemoryConsolidator::new(
            Arc::new(FakeRepo::new()),
            Arc::new(FailingStore),
            Arc::new(FakeLlm { verdict: "COMPATIBLE" }),
            "qwen2.5:3b",
            "knowledge_base",
        );
        let result = c
            .consolidate("user-1", "some fact", MemoryCategory::Factual, 0.5, SourceType::MainChat, &[1.0, 0.0])
            .await;
        assert_eq!(result.action, ConsolidationAction::Store);
    }
}
