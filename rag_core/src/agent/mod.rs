//! The RAG decision agent: asks the local LLM for a structured verdict on
//! whether a user turn needs retrieval, and enforces the invariants the
//! rest of the pipeline relies on regardless of what the model actually
//! returned.

mod cleaning;

pub use cleaning::strip_self_referential;

use std::sync::Arc;
use tracing::{debug, warn};

use crate::traits::LocalLlmClient;
use crate::types::{AgentDecision, QueryStrategy};

/// System prompt for the retrieval-routing classification contract. Kept
/// as a single `const` near the call site, inlining prompt text directly
/// in the module that sends it rather than loading it from a template
/// file.
const SYSTEM_PROMPT: &str = "You are a retrieval-routing assistant for a desktop knowledge base. \
Given the user's message, decide whether answering it plausibly requires retrieving \
the user's private content (documents, notes, uploaded files, prior imports). \
General knowledge, greetings, arithmetic, translation, and creative writing do NOT need retrieval. \
When retrieval is needed, choose a query strategy: 'direct' for a specific query, \
'multi_perspective' for ambiguous phrasing where 2-3 paraphrases widen recall, \
'decomposed' for a compound query that splits into independent parts. \
Always produce a cleaned_query: the user's message rewritten to remove self-referential \
framing such as 'my notes' or 'what I uploaded', so a downstream model does not attempt \
a second retrieval. If there is nothing to strip, return the message unchanged. \
Respond with the requested JSON shape only.";

/// Thin wrapper around a `LocalLlmClient` that owns the model name and the
/// prompt contract. Holds no other state — a turn is fully described by its
/// `user_query` argument (the agent never sees retrieved context).
pub struct RagAgent {
    client: Arc<dyn LocalLlmClient>,
    model: String,
}

impl RagAgent {
    #[must_use]
    pub fn new(client: Arc<dyn LocalLlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Produces a structured verdict for a single user turn. Never raises:
    /// `LocalLlmClient::chat` is contractually infallible (it converts
    /// parse/timeout failures to `AgentDecision::safe_fallback` itself),
    /// and this method additionally repairs any invariant violation the
    /// model's output still managed to produce.
    pub async fn decide(&self, user_query: &str) -> AgentDecision {
        debug!(model = %self.model, "agent_thinking");

        let mut decision = self
            .client
            .chat(&self.model, SYSTEM_PROMPT, user_query, user_query)
            .await;

        self.enforce_invariants(&mut decision, user_query);
        decision
    }

    /// `needs_retrieval = false` implies an empty query list and vice versa
    /// (clamped to 1-3). A model or a buggy fallback that violates this is
    /// repaired rather than trusted, since the multi-query executor assumes
    /// the invariant holds.
    fn enforce_invariants(&self, decision: &mut AgentDecision, user_query: &str) {
        if !decision.needs_retrieval && !decision.search_queries.is_empty() {
            warn!("model set needs_retrieval=false with non-empty search_queries; clearing");
            decision.search_queries.clear();
        }

        if decision.needs_retrieval {
            if decision.search_queries.is_empty() {
                warn!(
                    "model set needs_retrieval=true with no search_queries; falling back to cleaned_query"
                );
                decision.search_queries.push(decision.cleaned_query.clone());
            }
            if decision.search_queries.len() > 3 {
                decision.search_queries.truncate(3);
            }
        }

        decision.cleaned_query = strip_self_referential(&decision.cleaned_query);

        if decision.cleaned_query.trim().is_empty() {
            decision.cleaned_query = user_query.to_string();
        }

        if !matches!(
            decision.query_strategy,
            QueryStrategy::Direct | QueryStrategy::MultiPerspective | QueryStrategy::Decomposed
        ) {
            decision.query_strategy = QueryStrategy::Direct;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::error::CoreResult;
    use crate::traits::HealthStatus;

    struct FakeClient {
        response: Mutex<AgentDecision>,
    }

    #[async_trait]
    impl LocalLlmClient for FakeClient {
        async fn health(&self, _model: &str) -> HealthStatus {
            HealthStatus {
                available: true,
                models: vec![],
                error: None,
            }
        }

        async fn chat(
            &self,
            _model: &str,
            _system_prompt: &str,
            _user_message: &str,
            _original_query: &str,
        ) -> AgentDecision {
            self.response.lock().expect("lock").clone()
        }

        async fn complete_one_word(&self, _model: &str, _prompt: &str) -> CoreResult<String> {
            Ok("COMPATIBLE".to_string())
        }
    }

    #[tokio::test]
    async fn repairs_inconsistent_needs_retrieval_false() {
        let fake = Arc::new(FakeClient {
            response: Mutex::new(AgentDecision {
                needs_retrieval: false,
                reasoning: "oops".to_string(),
                search_queries: vec!["leftover".to_string()],
                query_strategy: QueryStrategy::Direct,
                cleaned_query: "what is python?".to_string(),
                failed: false,
            }),
        });
        let agent = RagAgent::new(fake, "qwen2.5:3b");
        let decision = agent.decide("what is python?").await;
        assert!(!decision.needs_retrieval);
        assert!(decision.search_queries.is_empty());
    }

    #[tokio::test]
    async fn repairs_empty_queries_when_retrieval_needed() {
        let fake = Arc::new(FakeClient {
            response: Mutex::new(AgentDecision {
                needs_retrieval: true,
                reasoning: "needs notes".to_string(),
                search_queries: vec![],
                query_strategy: QueryStrategy::Direct,
                cleaned_query: "what is MLP?".to_string(),
                failed: false,
            }),
        });
        let agent = RagAgent::new(fake, "qwen2.5:3b");
        let decision = agent.decide("what is MLP according to my files?").await;
        assert_eq!(decision.search_queries.len(), 1);
    }

    #[tokio::test]
    async fn truncates_over_three_queries() {
        let fake = Arc::new(FakeClient {
            response: Mutex::new(AgentDecision {
                needs_retrieval: true,
                reasoning: "broad".to_string(),
                search_queries: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                query_strategy: QueryStrategy::MultiPerspective,
                cleaned_query: "q".to_string(),
                failed: false,
            }),
        });
        let agent = RagAgent::new(fake, "qwen2.5:3b");
        let decision = agent.decide("q").await;
        assert_eq!(decision.search_queries.len(), 3);
    }

    #[tokio::test]
    async fn general_knowledge_query_passes_through_unmodified() {
        let fake = Arc::new(FakeClient {
            response: Mutex::new(AgentDecision::skip("n/a", "What is Python?")),
        });
        let agent = RagAgent::new(fake, "qwen2.5:3b");
        let decision = agent.decide("What is Python?").await;
        assert!(!decision.needs_retrieval);
        assert_eq!(decision.cleaned_query, "What is Python?");
    }

    #[tokio::test]
    async fn self_referential_phrasing_is_stripped_even_when_the_model_forgets_to() {
        let fake = Arc::new(FakeClient {
            response: Mutex::new(AgentDecision {
                needs_retrieval: true,
                reasoning: "needs notes".to_string(),
                search_queries: vec!["roadmap".to_string()],
                query_strategy: QueryStrategy::Direct,
                cleaned_query: "What is the roadmap according to my notes?".to_string(),
                failed: false,
            }),
        });
        let agent = RagAgent::new(fake, "qwen2.5:3b");
        let decision = agent.decide("What is the roadmap according to my notes?").await;
        assert_eq!(decision.cleaned_query, "What is the roadmap?");
    }
}
