#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

mod ollama;
mod parser;
mod qdrant;
mod retry;
mod web_session;

pub use ollama::OllamaClient;
pub use parser::parse_response_text;
pub use qdrant::QdrantStore;
pub use retry::retry_with_backoff;
pub use web_session::{CookieStore, GeminiWebSession};
