//! Local LLM runtime client against an Ollama-compatible HTTP API: both the
//! embedding endpoint (`/api/embeddings`) and the chat/completion endpoint
//! (`/api/chat`) live on the same base URL, so one struct owns both traits
//! with a single shared HTTP handle.

use std::time::Duration;

use async_trait::async_trait;
use rag_core::{AgentDecision, CoreError, CoreResult, EmbeddingProvider, EmbeddingVector, HealthStatus, LocalLlmClient, QueryStrategy};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::retry::retry_with_backoff;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const CHAT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OllamaClient {
    base_url: String,
    http: Client,
}

impl OllamaClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed(&self, text: &str) -> CoreResult<EmbeddingVector> {
        let body = EmbeddingsRequest {
            model: "nomic-embed-text",
            prompt: text,
        };

        let response = retry_with_backoff(
            || async {
                self.http
                    .post(self.url("/api/embeddings"))
                    .json(&body)
                    .send()
                    .await
                    .map_err(|err| err.to_string())
            },
            &[1, 2],
            1,
        )
        .await
        .map_err(CoreError::Unavailable)?;

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|err| CoreError::Parse(err.to_string()))?;

        Ok(parsed.embedding)
    }
}

#[derive(Serialize)]
struct ChatMessagePayload<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessagePayload<'a>>,
    format: serde_json::Value,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// The JSON shape the model is instructed to produce, before it is mapped
/// onto `AgentDecision`.
#[derive(Deserialize)]
struct DecisionPayload {
    needs_retrieval: bool,
    reasoning: String,
    #[serde(default)]
    search_queries: Vec<String>,
    #[serde(default)]
    query_strategy: String,
    cleaned_query: String,
}

fn decision_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "needs_retrieval": { "type": "boolean" },
            "reasoning": { "type": "string" },
            "search_queries": { "type": "array", "items": { "type": "string" } },
            "query_strategy": { "type": "string", "enum": ["direct", "multi_perspective", "decomposed"] },
            "cleaned_query": { "type": "string" }
        },
        "required": ["needs_retrieval", "reasoning", "search_queries", "query_strategy", "cleaned_query"]
    })
}

fn parse_query_strategy(raw: &str) -> QueryStrategy {
    match raw {
        "multi_perspective" => QueryStrategy::MultiPerspective,
        "decomposed" => QueryStrategy::Decomposed,
        _ => QueryStrategy::Direct,
    }
}

#[derive(Deserialize)]
struct ModelsResponse {
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    name: String,
}

#[async_trait]
impl LocalLlmClient for OllamaClient {
    async fn health(&self, model: &str) -> HealthStatus {
        let request = self.http.get(self.url("/api/tags")).send();

        let response = match tokio::time::timeout(HEALTH_TIMEOUT, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                return HealthStatus { available: false, models: vec![], error: Some(err.to_string()) };
            }
            Err(_) => {
                return HealthStatus { available: false, models: vec![], error: Some("health check timed out".to_string()) };
            }
        };

        let parsed: ModelsResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(err) => {
                return HealthStatus { available: false, models: vec![], error: Some(err.to_string()) };
            }
        };

        let models: Vec<String> = parsed.models.into_iter().map(|m| m.name).collect();
        let prefix = model.split(':').next().unwrap_or(model);
        let has_model = models.iter().any(|m| m.split(':').next().unwrap_or(m) == prefix);

        HealthStatus {
            available: has_model,
            error: (!has_model).then(|| format!("model '{model}' not found on runtime")),
            models,
        }
    }

    async fn chat(&self, model: &str, system_prompt: &str, user_message: &str, original_query: &str) -> AgentDecision {
        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessagePayload { role: "system", content: system_prompt },
                ChatMessagePayload { role: "user", content: user_message },
            ],
            format: decision_schema(),
            stream: false,
            options: ChatOptions { temperature: 0.0 },
        };

        let call = self.http.post(self.url("/api/chat")).json(&body).send();

        let response = match tokio::time::timeout(CHAT_TIMEOUT, call).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!(error = %err, "ollama chat request failed, falling back to no retrieval");
                return AgentDecision::safe_fallback(err.to_string(), original_query);
            }
            Err(_) => {
                warn!("ollama chat request timed out, falling back to no retrieval");
                return AgentDecision::safe_fallback("local model runtime timed out", original_query);
            }
        };

        let parsed: ChatResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "ollama chat response was not valid JSON, falling back");
                return AgentDecision::safe_fallback(err.to_string(), original_query);
            }
        };

        let decision: DecisionPayload = match serde_json::from_str(&parsed.message.content) {
            Ok(decision) => decision,
            Err(err) => {
                warn!(error = %err, "model output did not match the decision schema, falling back");
                return AgentDecision::safe_fallback(err.to_string(), original_query);
            }
        };

        AgentDecision {
            needs_retrieval: decision.needs_retrieval,
            reasoning: decision.reasoning,
            search_queries: decision.search_queries,
            query_strategy: parse_query_strategy(&decision.query_strategy),
            cleaned_query: decision.cleaned_query,
            failed: false,
        }
    }

    async fn complete_one_word(&self, model: &str, prompt: &str) -> CoreResult<String> {
        let body = ChatRequest {
            model,
            messages: vec![ChatMessagePayload { role: "user", content: prompt }],
            format: serde_json::Value::Null,
            stream: false,
            options: ChatOptions { temperature: 0.0 },
        };

        let call = self.http.post(self.url("/api/chat")).json(&body).send();

        let response = tokio::time::timeout(CHAT_TIMEOUT, call)
            .await
            .map_err(|_| CoreError::Timeout("contradiction check timed out".to_string()))?
            .map_err(|err| CoreError::Unavailable(err.to_string()))?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| CoreError::Parse(err.to_string()))?;

        Ok(parsed.message.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_strategy_defaults_to_direct_on_unknown_value() {
        assert_eq!(parse_query_strategy("garbage"), QueryStrategy::Direct);
        assert_eq!(parse_query_strategy("decomposed"), QueryStrategy::Decomposed);
        assert_eq!(parse_query_strategy("multi_perspective"), QueryStrategy::MultiPerspective);
    }

    #[test]
    fn health_url_joins_base_without_double_slash() {
        let client = OllamaClient::new("http://localhost:11434/");
        assert_eq!(client.url("/api/tags"), "http://localhost:11434/api/tags");
    }
}
