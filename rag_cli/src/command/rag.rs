use std::sync::Arc;

use rag_config::Config;
use rag_core::{format_context_for_prompt, process_rag_query, MultiQueryExecutor, RagAgent, RagEvent};
use rag_providers::{OllamaClient, QdrantStore};
use tokio::sync::mpsc::unbounded_channel;
use tracing::info;

pub struct RagInput {
    pub query: String,
}

/// Runs a single user turn through the retrieval pipeline and prints the
/// decision, the formatted context block, and the timing breakdown.
#[derive(Debug, Clone, Copy)]
pub struct RagStrategy;

impl super::CommandStrategy for RagStrategy {
    type Input = RagInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        let ollama = Arc::new(OllamaClient::new(&config.rag.ollama_url));
        let store = Arc::new(QdrantStore::new(
            &config.knowledge.qdrant_url,
            config.knowledge.qdrant_api_key.as_deref(),
        )?);

        let agent = RagAgent::new(ollama.clone(), &config.rag.model);
        let executor = MultiQueryExecutor::new(ollama, store);

        let (tx, mut rx) = unbounded_channel();
        let events_task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    RagEvent::AgentThinking => info!("agent_thinking"),
                    RagEvent::Searching => info!("searching"),
                    RagEvent::Complete { queries_generated, chunks_retrieved, processing_time_ms } => {
                        info!(queries_generated, chunks_retrieved, processing_time_ms, "complete");
                    }
                    RagEvent::Skipped => info!("skipped"),
                    RagEvent::Error { message } => tracing::warn!(message, "error"),
                }
            }
        });

        let outcome = process_rag_query(
            &agent,
            &executor,
            &input.query,
            &config.knowledge.collection_name,
            &config.rag,
            &tx,
        )
        .await;
        drop(tx);
        events_task.await?;

        println!("needs_retrieval: {}", outcome.decision.needs_retrieval);
        println!("reasoning: {}", outcome.decision.reasoning);
        println!("cleaned_query: {}", outcome.decision.cleaned_query);
        println!("processing_time_ms: {}", outcome.processing_time_ms);

        let prompt_fragment = format_context_for_prompt(&outcome.contexts);
        if prompt_fragment.is_empty() {
            println!("\n(no context retrieved)");
        } else {
            println!("\n{prompt_fragment}");
        }

        Ok(())
    }
}
