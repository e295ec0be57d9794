//! Multi-query executor: fan out embed+search per query, dedup by result
//! id, score-filter, rank, cap.

mod context;

pub use context::format_context_for_prompt;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::warn;

use crate::settings::RagSettings;
use crate::traits::{EmbeddingProvider, VectorStore};
use crate::types::{RankedContext, Score};

pub struct MultiQueryExecutor {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl MultiQueryExecutor {
    #[must_use]
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Runs `queries` (truncated to `settings.max_queries`) through
    /// embed+search concurrently, merges by id keeping the higher score,
    /// drops anything below `settings.min_relevance_score`, and returns the
    /// top `settings.max_context_chunks` sorted descending by score with a
    /// stable `(score desc, id asc)` tie-break for deterministic ordering.
    ///
    /// Per-query failures are logged and skipped; they never fail the
    /// batch.
    pub async fn execute(
        &self,
        queries: &[String],
        collection_name: &str,
        settings: &RagSettings,
    ) -> Vec<RankedContext> {
        let queries: Vec<&String> = queries.iter().take(settings.max_queries).collect();

        let futures = queries.into_iter().map(|query| {
            let embedder = Arc::clone(&self.embedder);
            let store = Arc::clone(&self.store);
            let collection_name = collection_name.to_string();
            let query = query.clone();
            let top_k = settings.max_context_chunks;

            async move {
                let vector = match embedder.embed(&query).await {
                    Ok(v) => v,
                    Err(err) => {
                        warn!(%query, error = %err, "embedding failed for query, skipping");
                        return Vec::new();
                    }
                };

                match store.search(&collection_name, &vector, top_k).await {
                    Ok(results) => results,
                    Err(err) => {
                        warn!(%query, error = %err, "vector search failed for query, skipping");
                        Vec::new()
                    }
                }
            }
        });

        let per_query_results = join_all(futures).await;

        let mut merged: HashMap<String, RankedContext> = HashMap::new();
        for results in per_query_results {
            for result in results {
                let source = result
                    .metadata
                    .source
                    .is_empty()
                    .then(|| "Unknown".to_string())
                    .unwrap_or(result.metadata.source.clone());

                merged
                    .entry(result.id.clone())
                    .and_modify(|existing| {
                        if result.score > existing.score {
                            existing.score = result.score;
                            existing.content = result.content.clone();
                            existing.source = source.clone();
                        }
                    })
                    .or_insert_with(|| RankedContext {
                        content: result.content,
                        source,
                        score: result.score,
                        id: result.id.clone(),
                    });
            }
        }

        let mut contexts: Vec<RankedContext> = merged
            .into_values()
            .filter(|c| c.score >= settings.min_relevance_score)
            .collect();

        contexts.sort_by(|a, b| {
            Score(b.score)
                .cmp(&Score(a.score))
                .then_with(|| a.id.cmp(&b.id))
        });

        contexts.truncate(settings.max_context_chunks);
        contexts
    }
}
