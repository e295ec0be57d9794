//! Per-feature settings structs. These are plain data; the collaborator
//! (here, `rag_config`) owns loading/persisting them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    pub enabled: bool,
    pub ollama_url: String,
    pub model: String,
    /// `[1, 3]`.
    pub max_queries: usize,
    /// `[1, 20]`.
    pub max_context_chunks: usize,
    /// `[0, 1]`.
    pub min_relevance_score: f64,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ollama_url: "http://localhost:11434".to_string(),
            model: "qwen2.5:3b".to_string(),
            max_queries: 3,
            max_context_chunks: 5,
            min_relevance_score: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSettings {
    pub qdrant_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qdrant_api_key: Option<String>,
    pub collection_name: String,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6334".to_string(),
            qdrant_api_key: None,
            collection_name: "knowledge_base".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySettings {
    pub enabled: bool,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSessionSettings {
    pub enabled: bool,
}

impl Default for WebSessionSettings {
    fn default() -> Self {
        Self { enabled: false }
    }
}
