use rag_config::Config;

/// Strategy for displaying configuration information.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== ragcore configuration ===\n");

        println!("RAG:");
        println!("  Enabled: {}", config.rag.enabled);
        println!("  Ollama URL: {}", config.rag.ollama_url);
        println!("  Model: {}", config.rag.model);
        println!("  Max queries: {}", config.rag.max_queries);
        println!("  Max context chunks: {}", config.rag.max_context_chunks);
        println!("  Min relevance score: {}", config.rag.min_relevance_score);
        println!();

        println!("Knowledge store:");
        println!("  Qdrant URL: {}", config.knowledge.qdrant_url);
        println!("  Collection: {}", config.knowledge.collection_name);
        println!(
            "  API key: {}",
            if config.knowledge.qdrant_api_key.is_some() { "set" } else { "(not set)" }
        );
        println!();

        println!("Memory:");
        println!("  Enabled: {}", config.memory.enabled);
        println!(
            "  Supabase URL: {}",
            if config.memory.supabase_url.is_empty() { "(not set)" } else { &config.memory.supabase_url }
        );
        println!();

        println!("Web session:");
        println!("  Enabled: {}", config.web_session.enabled);

        Ok(())
    }
}
