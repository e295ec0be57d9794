//! Status events emitted over the course of a single query, for a caller
//! (the desktop shell) to render retrieval progress live.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RagEvent {
    AgentThinking,
    Searching,
    Complete {
        queries_generated: usize,
        chunks_retrieved: usize,
        processing_time_ms: u64,
    },
    Skipped,
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_event_serializes_with_tagged_status() {
        let event = RagEvent::Complete {
            queries_generated: 2,
            chunks_retrieved: 4,
            processing_time_ms: 128,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"status\":\"complete\""));
        assert!(json.contains("\"queries_generated\":2"));
    }

    #[test]
    fn skipped_event_serializes_as_bare_status() {
        let json = serde_json::to_string(&RagEvent::Skipped).expect("serialize");
        assert_eq!(json, "{\"status\":\"skipped\"}");
    }
}
