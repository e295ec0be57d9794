use std::str::FromStr;
use std::sync::Arc;

use rag_config::Config;
use rag_core::{MemoryCategory, SourceType};
use rag_memory::MemoryConsolidator;
use rag_providers::OllamaClient;

use crate::memory_repo::JsonFileMemoryRepo;

pub struct MemoryInput {
    pub content: String,
    pub category: String,
    pub importance: f64,
}

/// Runs a candidate fact through memory consolidation against the local
/// JSON-backed demo repository and prints the verdict.
#[derive(Debug, Clone, Copy)]
pub struct MemoryStrategy;

impl super::CommandStrategy for MemoryStrategy {
    type Input = MemoryInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        if !config.memory.enabled {
            anyhow::bail!("memory feature is disabled in config; set memory.enabled = true");
        }

        let category = MemoryCategory::from_str(&input.category)
            .map_err(|err| anyhow::anyhow!("invalid category '{}': {err}", input.category))?;

        let repo_path = rag_config::Config::ensure_config_dir()?.join("memories.json");
        let repo = Arc::new(JsonFileMemoryRepo::open(repo_path)?);

        let ollama = Arc::new(OllamaClient::new(&config.rag.ollama_url));
        let store = Arc::new(rag_providers::QdrantStore::new(
            &config.knowledge.qdrant_url,
            config.knowledge.qdrant_api_key.as_deref(),
        )?);

        let consolidator = MemoryConsolidator::new(
            repo,
            store,
            ollama.clone(),
            &config.rag.model,
            &config.knowledge.collection_name,
        );

        let embedding = rag_core::EmbeddingProvider::embed(ollama.as_ref(), &input.content).await?;

        let result = consolidator
            .consolidate("default", &input.content, category, input.importance, SourceType::MainChat, &embedding)
            .await;

        println!("action: {:?}", result.action);
        println!("reason: {}", result.reason);
        if let Some(id) = result.existing_id {
            println!("existing_id: {id}");
        }

        Ok(())
    }
}
